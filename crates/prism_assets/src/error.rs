#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to import glTF {path}: {source}")]
    Import {
        path: String,
        #[source]
        source: gltf::Error,
    },
    #[error("failed to decode image {name}: {source}")]
    Image {
        name: String,
        #[source]
        source: image::ImageError,
    },
    #[error("image {name} uses an embedded data URI, which is not supported")]
    DataUri { name: String },
    #[error("image {name} points outside its buffer (bytes {start}..{end} of {len})")]
    BufferViewOutOfRange {
        name: String,
        start: usize,
        end: usize,
        len: usize,
    },
    #[error("mesh {mesh} primitive {primitive}: {attribute} has {found} entries, POSITION has {expected}")]
    AttributeCountMismatch {
        mesh: usize,
        primitive: usize,
        attribute: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("mesh {mesh} primitive {primitive} is missing {attribute}")]
    MissingAttribute {
        mesh: usize,
        primitive: usize,
        attribute: &'static str,
    },
}
