//! Process-local snowflake ID generation.
//!
//! Layout follows the usual 64-bit scheme: 42 bits of milliseconds since a
//! deployment-specific epoch, 5 bits of worker ID, 5 bits of process ID and
//! a 12-bit wrapping increment.

use derive_where::derive_where;
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use std::{
    fmt::{Display, Formatter},
    marker::PhantomData,
};
use thiserror::Error;
use time::{Duration, UtcDateTime};

pub const TIMESTAMP_OFFSET: u64 = 22;
pub const TIMESTAMP_LENGTH: u64 = 42;

pub const WORKER_ID_OFFSET: u64 = 17;
pub const WORKER_ID_LENGTH: u64 = 5;

pub const PROCESS_ID_OFFSET: u64 = 12;
pub const PROCESS_ID_LENGTH: u64 = 5;

pub const INCREMENT_OFFSET: u64 = 0;
pub const INCREMENT_LENGTH: u64 = 12;

const fn bitmask(offset: u64, length: u64) -> u64 {
    ((1 << length) - 1) << offset
}

/// The reference instant timestamps are measured against.
pub trait Epoch {
    const EPOCH_TIME: UtcDateTime;
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum SnowflakeTimestampFromDateTimeError {
    #[error("Specified time was before the snowflake epoch.")]
    TimeBeforeEpoch,
    #[error("Resulting timestamp uses too many bits.")]
    TimestampTooLarge,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Snowflake part was out of range for creation: {0}")]
pub struct SnowflakePartOutOfRangeError<TInt>(pub TInt);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
pub struct WorkerId(u8);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
pub struct ProcessId(u8);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
pub struct SnowflakeIncrement(u16);

#[derive_where(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
pub struct SnowflakeTimestamp<SnowflakeEpoch>(u64, PhantomData<SnowflakeEpoch>);

macro_rules! bounded_part_impls {
    ($name:ident: $repr:ty; len = $length:ident) => {
        impl $name {
            #[must_use]
            pub fn new(value: $repr) -> Option<Self> {
                (value < 1 << $length).then_some(Self(value))
            }

            #[must_use]
            pub fn new_unchecked(value: $repr) -> Self {
                Self::new(value).expect(concat!(stringify!($name), " out of range."))
            }

            #[must_use]
            pub fn get(self) -> $repr {
                self.0
            }
        }

        impl TryFrom<$repr> for $name {
            type Error = SnowflakePartOutOfRangeError<$repr>;

            fn try_from(value: $repr) -> Result<Self, Self::Error> {
                Self::new(value).ok_or(SnowflakePartOutOfRangeError(value))
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let inner = <$repr as Deserialize<'de>>::deserialize(deserializer)?;
                Self::new(inner).ok_or_else(|| {
                    Error::invalid_value(Unexpected::Unsigned(inner.into()), &stringify!($name))
                })
            }
        }
    };
}

bounded_part_impls!(WorkerId: u8; len = WORKER_ID_LENGTH);
bounded_part_impls!(ProcessId: u8; len = PROCESS_ID_LENGTH);
bounded_part_impls!(SnowflakeIncrement: u16; len = INCREMENT_LENGTH);

impl SnowflakeIncrement {
    #[must_use]
    pub fn next(self) -> Self {
        Self((self.0 + 1) % (1 << INCREMENT_LENGTH))
    }

    pub fn increment(&mut self) {
        *self = self.next();
    }
}

impl<SnowflakeEpoch> SnowflakeTimestamp<SnowflakeEpoch> {
    #[must_use]
    pub fn new(millis: u64) -> Option<Self> {
        (millis < 1 << TIMESTAMP_LENGTH).then_some(Self(millis, PhantomData))
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }

    #[must_use]
    pub fn from_time_unchecked(value: UtcDateTime) -> Self
    where
        SnowflakeEpoch: Epoch,
    {
        Self::try_from(value).expect("Cannot create timestamp.")
    }

    #[must_use]
    pub fn now() -> Self
    where
        SnowflakeEpoch: Epoch,
    {
        Self::from_time_unchecked(UtcDateTime::now())
    }
}

impl<SnowflakeEpoch: Epoch> TryFrom<UtcDateTime> for SnowflakeTimestamp<SnowflakeEpoch> {
    type Error = SnowflakeTimestampFromDateTimeError;

    fn try_from(value: UtcDateTime) -> Result<Self, Self::Error> {
        let millis = (value - SnowflakeEpoch::EPOCH_TIME).whole_milliseconds();
        if millis < 0 {
            return Err(Self::Error::TimeBeforeEpoch);
        }
        let millis_u64 = u64::try_from(millis).map_err(|_| Self::Error::TimestampTooLarge)?;
        Self::new(millis_u64).ok_or(Self::Error::TimestampTooLarge)
    }
}

impl<SnowflakeEpoch: Epoch> From<SnowflakeTimestamp<SnowflakeEpoch>> for UtcDateTime {
    fn from(value: SnowflakeTimestamp<SnowflakeEpoch>) -> Self {
        SnowflakeEpoch::EPOCH_TIME
            + Duration::milliseconds(value.0.try_into().expect("Invalid timestamp value"))
    }
}

#[derive_where(
    Copy,
    Clone,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Debug,
    Default,
    Hash,
    Serialize,
    Deserialize
)]
#[serde(transparent)]
pub struct Snowflake<SnowflakeEpoch>(u64, #[serde(skip)] PhantomData<SnowflakeEpoch>);

impl<SnowflakeEpoch> Snowflake<SnowflakeEpoch> {
    #[must_use]
    pub fn new(inner: u64) -> Self {
        Self(inner, PhantomData)
    }

    #[must_use]
    pub fn from_parts(
        timestamp: SnowflakeTimestamp<SnowflakeEpoch>,
        worker_id: WorkerId,
        process_id: ProcessId,
        increment: SnowflakeIncrement,
    ) -> Self {
        let snowflake = timestamp.get() << TIMESTAMP_OFFSET
            | u64::from(worker_id.get()) << WORKER_ID_OFFSET
            | u64::from(process_id.get()) << PROCESS_ID_OFFSET
            | u64::from(increment.get()) << INCREMENT_OFFSET;

        Snowflake(snowflake, PhantomData)
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }

    #[must_use]
    pub fn timestamp(self) -> SnowflakeTimestamp<SnowflakeEpoch> {
        let millis = (self.0 & bitmask(TIMESTAMP_OFFSET, TIMESTAMP_LENGTH)) >> TIMESTAMP_OFFSET;
        SnowflakeTimestamp(millis, PhantomData)
    }

    #[must_use]
    pub fn worker_id(self) -> WorkerId {
        #[allow(clippy::cast_possible_truncation)]
        WorkerId(((self.0 & bitmask(WORKER_ID_OFFSET, WORKER_ID_LENGTH)) >> WORKER_ID_OFFSET) as u8)
    }

    #[must_use]
    pub fn process_id(self) -> ProcessId {
        #[allow(clippy::cast_possible_truncation)]
        ProcessId(
            ((self.0 & bitmask(PROCESS_ID_OFFSET, PROCESS_ID_LENGTH)) >> PROCESS_ID_OFFSET) as u8,
        )
    }

    #[must_use]
    pub fn increment(self) -> SnowflakeIncrement {
        #[allow(clippy::cast_possible_truncation)]
        SnowflakeIncrement(
            ((self.0 & bitmask(INCREMENT_OFFSET, INCREMENT_LENGTH)) >> INCREMENT_OFFSET) as u16,
        )
    }

    #[must_use]
    pub fn into_parts(
        self,
    ) -> (
        SnowflakeTimestamp<SnowflakeEpoch>,
        WorkerId,
        ProcessId,
        SnowflakeIncrement,
    ) {
        (
            self.timestamp(),
            self.worker_id(),
            self.process_id(),
            self.increment(),
        )
    }

    /// The creation instant encoded in the timestamp part.
    #[must_use]
    pub fn created_at(self) -> UtcDateTime
    where
        SnowflakeEpoch: Epoch,
    {
        self.timestamp().into()
    }
}

impl<SnowflakeEpoch> Display for Snowflake<SnowflakeEpoch> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<SnowflakeEpoch> From<u64> for Snowflake<SnowflakeEpoch> {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl<SnowflakeEpoch> From<Snowflake<SnowflakeEpoch>> for u64 {
    fn from(value: Snowflake<SnowflakeEpoch>) -> Self {
        value.get()
    }
}

#[derive_where(Copy, Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct SnowflakeGenerator<SnowflakeEpoch> {
    worker_id: WorkerId,
    process_id: ProcessId,
    next_increment: SnowflakeIncrement,
    phantom_data: PhantomData<SnowflakeEpoch>,
}

impl<SnowflakeEpoch> SnowflakeGenerator<SnowflakeEpoch> {
    #[must_use]
    pub fn new(worker_id: WorkerId, process_id: ProcessId) -> Self {
        Self {
            worker_id,
            process_id,
            next_increment: SnowflakeIncrement::new_unchecked(0),
            phantom_data: PhantomData,
        }
    }

    #[must_use]
    pub fn worker_id(self) -> WorkerId {
        self.worker_id
    }

    #[must_use]
    pub fn process_id(self) -> ProcessId {
        self.process_id
    }

    pub fn generate_at(&mut self, time: UtcDateTime) -> Snowflake<SnowflakeEpoch>
    where
        SnowflakeEpoch: Epoch,
    {
        let increment = self.next_increment;
        self.next_increment.increment();

        Snowflake::from_parts(
            SnowflakeTimestamp::from_time_unchecked(time),
            self.worker_id,
            self.process_id,
            increment,
        )
    }

    pub fn generate(&mut self) -> Snowflake<SnowflakeEpoch>
    where
        SnowflakeEpoch: Epoch,
    {
        self.generate_at(UtcDateTime::now())
    }
}

#[cfg(test)]
mod tests {
    use crate::snowflake::{
        Epoch, ProcessId, Snowflake, SnowflakeGenerator, SnowflakeIncrement, SnowflakeTimestamp,
        SnowflakeTimestampFromDateTimeError, WorkerId,
    };
    use time::{Duration, UtcDateTime, macros::utc_datetime};

    struct TestEpoch;
    impl Epoch for TestEpoch {
        const EPOCH_TIME: UtcDateTime = utc_datetime!(2020-01-01 00:00);
    }

    #[test]
    fn legal_values() {
        assert!(SnowflakeTimestamp::<TestEpoch>::new(0).is_some());
        assert!(SnowflakeTimestamp::<TestEpoch>::new(0x03FF_FFFF_FFFF).is_some());
        assert!(SnowflakeTimestamp::<TestEpoch>::new(0x0400_0000_0000).is_none());
        assert!(SnowflakeTimestamp::<TestEpoch>::new(u64::MAX).is_none());

        for legal_id in [0, 0xD, 0x1F] {
            assert!(WorkerId::new(legal_id).is_some());
            assert!(ProcessId::new(legal_id).is_some());
        }
        for illegal_id in [0x20, 0xF0, u8::MAX] {
            assert!(WorkerId::new(illegal_id).is_none());
            assert!(ProcessId::new(illegal_id).is_none());
        }

        for legal_increment in [0, 0xFF, 0xFFF] {
            assert!(SnowflakeIncrement::new(legal_increment).is_some());
        }
        for illegal_increment in [0x1000, 0xFF00, u16::MAX] {
            assert!(SnowflakeIncrement::new(illegal_increment).is_none());
        }
    }

    #[test]
    fn snowflake_timestamp() {
        let legal_date_times = [
            TestEpoch::EPOCH_TIME,
            utc_datetime!(2025-06-15 10:00),
            TestEpoch::EPOCH_TIME + Duration::milliseconds(0x03FF_FFFF_FFFF),
        ];

        for legal_date_time in legal_date_times {
            let timestamp = SnowflakeTimestamp::<TestEpoch>::try_from(legal_date_time).unwrap();
            assert_eq!(UtcDateTime::from(timestamp), legal_date_time);
        }

        assert_eq!(
            SnowflakeTimestamp::<TestEpoch>::try_from(
                TestEpoch::EPOCH_TIME - Duration::milliseconds(1)
            ),
            Err(SnowflakeTimestampFromDateTimeError::TimeBeforeEpoch)
        );

        assert_eq!(
            SnowflakeTimestamp::<TestEpoch>::try_from(
                TestEpoch::EPOCH_TIME + Duration::milliseconds(0x0400_0000_0000)
            ),
            Err(SnowflakeTimestampFromDateTimeError::TimestampTooLarge)
        );
    }

    #[test]
    fn snowflake_increment_wraps() {
        assert_eq!(
            SnowflakeIncrement::new_unchecked(0).next(),
            SnowflakeIncrement::new_unchecked(1)
        );
        assert_eq!(
            SnowflakeIncrement::new_unchecked(0xFFF).next(),
            SnowflakeIncrement::new_unchecked(0)
        );

        let mut increment = SnowflakeIncrement::new_unchecked(0xFFE);
        increment.increment();
        assert_eq!(increment, SnowflakeIncrement::new_unchecked(0xFFF));
        increment.increment();
        assert_eq!(increment, SnowflakeIncrement::new_unchecked(0));
    }

    #[test]
    fn snowflake_from_into_parts() {
        let timestamp = SnowflakeTimestamp::new(0x1234_5678).unwrap();
        let worker_id = WorkerId::new_unchecked(0b10101);
        let process_id = ProcessId::new_unchecked(0b10001);
        let increment = SnowflakeIncrement::new_unchecked(100);

        let snowflake =
            Snowflake::<TestEpoch>::from_parts(timestamp, worker_id, process_id, increment);

        let expected = (0x1234_5678_u64 << 22) | (0b10101 << 17) | (0b10001 << 12) | 100;
        assert_eq!(snowflake.get(), expected);

        assert_eq!(snowflake.timestamp(), timestamp);
        assert_eq!(snowflake.worker_id(), worker_id);
        assert_eq!(snowflake.process_id(), process_id);
        assert_eq!(snowflake.increment(), increment);
        assert_eq!(
            snowflake.into_parts(),
            (timestamp, worker_id, process_id, increment)
        );
    }

    #[test]
    fn snowflake_generator() {
        let worker_id = WorkerId::new_unchecked(10);
        let process_id = ProcessId::new_unchecked(3);
        let time = utc_datetime!(2025-06-15 11:00);

        let mut generator = SnowflakeGenerator::<TestEpoch>::new(worker_id, process_id);

        let first = generator.generate_at(time);
        let second = generator.generate_at(time);

        assert_eq!(first.timestamp(), second.timestamp());
        assert_eq!(first.increment(), SnowflakeIncrement::new_unchecked(0));
        assert_eq!(second.increment(), SnowflakeIncrement::new_unchecked(1));
        assert!(first.get() < second.get());
    }

    #[test]
    fn created_at_roundtrip() {
        let time = utc_datetime!(2025-03-01 08:30);
        let mut generator = SnowflakeGenerator::<TestEpoch>::new(
            WorkerId::new_unchecked(0),
            ProcessId::new_unchecked(0),
        );

        assert_eq!(generator.generate_at(time).created_at(), time);
    }
}
