pub mod frontmatter;
pub mod knowledge_store;
pub mod sanitize;
pub mod store;

pub use knowledge_store::KnowledgeBaseStore;
pub use sanitize::sanitize_filename;
pub use store::FileSystemStore;
