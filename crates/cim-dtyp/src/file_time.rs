//! [`FileTime`]: Windows `FILETIME` (100-ns ticks since 1601-01-01 UTC).

use binrw::prelude::*;
use time::{Duration, OffsetDateTime};

/// The Windows FILETIME epoch, expressed as a Unix-epoch-relative offset:
/// 1601-01-01 is this many seconds before 1970-01-01.
const FILETIME_TO_UNIX_EPOCH_SECS: i64 = 11_644_473_600;

/// A raw Windows `FILETIME`: 100-nanosecond intervals since 1601-01-01 UTC.
#[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct FileTime(pub u64);

impl FileTime {
    pub fn to_offset_date_time(self) -> OffsetDateTime {
        let ticks_100ns = self.0 as i64;
        let unix_nanos_100 = ticks_100ns - FILETIME_TO_UNIX_EPOCH_SECS * 10_000_000;
        OffsetDateTime::UNIX_EPOCH + Duration::nanoseconds(unix_nanos_100 * 100)
    }
}

impl From<u64> for FileTime {
    fn from(value: u64) -> Self {
        FileTime(value)
    }
}
