//! Prompt assembly.
//!
//! Turns (user message, combined document text, history, system prompt,
//! optional images) into the ordered content blocks the model call needs.
//! The order is fixed and significant for the model's attention and
//! caching behavior: context first, primer, replayed history, then the new
//! turn. Pure function, no I/O.

use base64::Engine;
use shared::agent_api::{ContentBlock, Part, Role};
use shared::types::Message;

use crate::prompts::{
    CITATION_INSTRUCTION, DOCUMENT_BANNER_END, DOCUMENT_BANNER_START, PRIMER_REPLY,
};

/// An image the user attached to the conversation.
#[derive(Debug, Clone)]
pub struct ImageAttachment {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

pub fn build_content_blocks(
    user_message: &str,
    combined_text: &str,
    history: &[Message],
    system_prompt: &str,
    images: &[ImageAttachment],
) -> Vec<ContentBlock> {
    let mut blocks = Vec::with_capacity(history.len() + 3);

    // 1. Context setter: persona, delimited document text, citation rule.
    let context = format!(
        "{system_prompt}\n\n{DOCUMENT_BANNER_START}\n\n{combined_text}\n\n{DOCUMENT_BANNER_END}\n\n{CITATION_INSTRUCTION}"
    );
    let mut parts = vec![Part::Text(context)];

    // 2. Images ride on the same first turn.
    for image in images {
        parts.push(Part::InlineData {
            mime_type: image.mime_type.clone(),
            data: base64::engine::general_purpose::STANDARD.encode(&image.bytes),
        });
    }
    blocks.push(ContentBlock {
        role: Role::User,
        parts,
    });

    // 3. Constant acknowledgment primer from the model role.
    blocks.push(ContentBlock::text(Role::Model, PRIMER_REPLY));

    // 4. History replayed in order; non-user roles collapse to model.
    for message in history {
        let role = if message.role == "user" {
            Role::User
        } else {
            Role::Model
        };
        blocks.push(ContentBlock::text(role, message.content.clone()));
    }

    // 5. The new turn.
    blocks.push(ContentBlock::text(Role::User, user_message));

    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(role: &str, content: &str) -> Message {
        Message {
            role: role.to_string(),
            content: content.to_string(),
            timestamp: 0,
        }
    }

    fn first_text(block: &ContentBlock) -> &str {
        match &block.parts[0] {
            Part::Text(text) => text,
            other => panic!("expected text part, got {other:?}"),
        }
    }

    #[test]
    fn blocks_follow_the_fixed_order() {
        let history = vec![msg("user", "earlier question"), msg("assistant", "earlier answer")];
        let blocks = build_content_blocks(
            "new question",
            "paper text",
            &history,
            "persona",
            &[],
        );

        assert_eq!(blocks.len(), 5);
        assert_eq!(blocks[0].role, Role::User);
        let context = first_text(&blocks[0]);
        assert!(context.starts_with("persona"));
        assert!(context.contains(DOCUMENT_BANNER_START));
        assert!(context.contains("paper text"));
        assert!(context.contains(DOCUMENT_BANNER_END));
        assert!(context.contains("page X"));

        assert_eq!(blocks[1].role, Role::Model);
        assert_eq!(first_text(&blocks[1]), PRIMER_REPLY);

        assert_eq!(first_text(&blocks[2]), "earlier question");
        assert_eq!(first_text(&blocks[3]), "earlier answer");

        assert_eq!(blocks[4].role, Role::User);
        assert_eq!(first_text(&blocks[4]), "new question");
    }

    #[test]
    fn non_user_roles_collapse_to_model() {
        let history = vec![msg("system", "notice"), msg("assistant", "answer")];
        let blocks = build_content_blocks("q", "text", &history, "p", &[]);
        assert_eq!(blocks[2].role, Role::Model);
        assert_eq!(blocks[3].role, Role::Model);
    }

    #[test]
    fn images_are_appended_to_the_first_block() {
        let images = vec![ImageAttachment {
            mime_type: "image/png".to_string(),
            bytes: vec![1, 2, 3],
        }];
        let blocks = build_content_blocks("q", "text", &[], "p", &images);

        assert_eq!(blocks[0].parts.len(), 2);
        match &blocks[0].parts[1] {
            Part::InlineData { mime_type, data } => {
                assert_eq!(mime_type, "image/png");
                assert!(!data.is_empty());
            }
            other => panic!("expected inline data, got {other:?}"),
        }
        // Primer still directly after the context block.
        assert_eq!(first_text(&blocks[1]), PRIMER_REPLY);
    }

    #[test]
    fn identical_inputs_build_identical_blocks() {
        let history = vec![msg("user", "q1")];
        let a = build_content_blocks("q", "text", &history, "p", &[]);
        let b = build_content_blocks("q", "text", &history, "p", &[]);
        assert_eq!(a, b);
    }
}
