//! Fixed prompt text: the default persona, document delimiters, and the
//! synthetic acknowledgment primer.

/// Default research-assistant persona, used when the user has not set a
/// custom system prompt.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a research assistant helping the user understand \
academic papers. Answer questions using only the document content provided. Be concise and \
precise, quote sparingly, and say so plainly when the documents do not contain the answer.";

pub const DOCUMENT_BANNER_START: &str = "=== DOCUMENT CONTENT START ===";
pub const DOCUMENT_BANNER_END: &str = "=== DOCUMENT CONTENT END ===";

/// Appended after the document content so answers cite pages in a form
/// the reference parser can pick up.
pub const CITATION_INSTRUCTION: &str = "When you reference information from the documents, cite \
the location as \"page X\" so the user can jump straight to it.";

/// Canned first reply from the model role. Establishes conversational
/// footing; regenerated on every build and never stored in the log.
pub const PRIMER_REPLY: &str = "I have analyzed the paper content you provided. Ask me anything \
about it and I will cite page numbers where relevant.";
