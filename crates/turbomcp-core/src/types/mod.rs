pub mod content;
pub mod core;

pub use content::{
    AudioContent, BlobResourceContents, ContentBlock, EmbeddedResource, ImageContent,
    ResourceContents, ResourceLink, TextContent, TextResourceContents,
};
pub use core::{Annotations, Base64String, Cursor, Meta, MimeType, Role, Uri};
