mod format;
mod reader;
mod writer;

pub use format::{
    RecordHeader, RecordType, GZIP_MAGIC, HTTP_CONTENT_TYPE, MAX_HEADER_FIELDS, MAX_HEADER_LINE,
    WARC_VERSION, WARC_VERSION_PREFIX,
};
pub use reader::{ArchiveReader, Record};
pub use writer::{ArchiveWriter, DEFAULT_WARC_DATE};
