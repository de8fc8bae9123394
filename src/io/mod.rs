mod range_reader;
mod s3_reader;

pub(crate) use range_reader::check_range;
pub use range_reader::{
    read_all, read_u16_be, read_u16_le, read_u32_be, read_u32_le, read_u64_be, read_u64_le,
    FileRangeReader, MemoryRangeReader, RangeReader,
};
pub use s3_reader::{create_s3_client, S3Object, S3RangeReader};
