//! Decoding of the MJD + BCD time formats used throughout SI tables.

use chrono::{DateTime, Duration, TimeZone, Utc};

/// Decodes a packed BCD byte. No validation, garbage in gives garbage out.
pub fn from_bcd(bcd: u8) -> u32 {
    10 * ((bcd >> 4) & 0xF) as u32 + (bcd & 0xF) as u32
}

/// Decodes a packed BCD byte, rejecting nibbles above nine. The all-ones
/// "undefined" time encoding fails this check on every byte.
fn from_bcd_checked(bcd: u8) -> Option<u32> {
    if (bcd >> 4) > 9 || (bcd & 0xF) > 9 {
        return None;
    }
    Some(from_bcd(bcd))
}

/// MJD day number of 1970-01-01.
const MJD_UNIX_EPOCH: i64 = 40587;

/// Decodes the 5-byte UTC start time format: a 16-bit Modified Julian Date
/// followed by hour, minute and second in BCD.
///
/// `None` for truncated input and for non-BCD time bytes, which covers
/// the all-ones encoding events use for an undefined start time.
pub fn decode_time(raw: &[u8]) -> Option<DateTime<Utc>> {
    if raw.len() < 5 {
        return None;
    }

    let mjd = u16::from_be_bytes([raw[0], raw[1]]) as i64;
    let hours = from_bcd_checked(raw[2])? as i64;
    let minutes = from_bcd_checked(raw[3])? as i64;
    let seconds = from_bcd_checked(raw[4])? as i64;

    let base = Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).single()?;
    Some(
        base + Duration::days(mjd - MJD_UNIX_EPOCH)
            + Duration::seconds(hours * 3600 + minutes * 60 + seconds),
    )
}

/// Decodes the 2-byte Modified Julian Date format to a UTC midnight.
pub fn decode_date(raw: &[u8]) -> Option<DateTime<Utc>> {
    if raw.len() < 2 {
        return None;
    }

    let mjd = u16::from_be_bytes([raw[0], raw[1]]) as i64;
    let base = Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).single()?;
    Some(base + Duration::days(mjd - MJD_UNIX_EPOCH))
}

/// Decodes the 3-byte BCD duration format (hours, minutes, seconds).
pub fn decode_duration(raw: &[u8]) -> Option<Duration> {
    if raw.len() < 3 {
        return None;
    }

    let hours = from_bcd_checked(raw[0])? as i64;
    let minutes = from_bcd_checked(raw[1])? as i64;
    let seconds = from_bcd_checked(raw[2])? as i64;

    Some(Duration::seconds(hours * 3600 + minutes * 60 + seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bcd_digits() {
        assert_eq!(from_bcd(0x00), 0);
        assert_eq!(from_bcd(0x59), 59);
        assert_eq!(from_bcd(0x23), 23);
    }

    #[test]
    fn mjd_epoch_maps_to_unix_epoch() {
        let raw = [0x9E, 0x8B, 0x00, 0x00, 0x00]; // MJD 40587
        let when = decode_time(&raw).unwrap();
        assert_eq!(when, Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn en300468_reference_time() {
        // Example from the standard: 93/10/13 12:45:00 == MJD 0xC079.
        let raw = [0xC0, 0x79, 0x12, 0x45, 0x00];
        let when = decode_time(&raw).unwrap();
        assert_eq!(when, Utc.with_ymd_and_hms(1993, 10, 13, 12, 45, 0).unwrap());
    }

    #[test]
    fn duration_hms() {
        let dur = decode_duration(&[0x01, 0x45, 0x30]).unwrap();
        assert_eq!(dur, Duration::seconds(3600 + 45 * 60 + 30));
    }

    #[test]
    fn short_input_is_rejected() {
        assert!(decode_time(&[0x00; 4]).is_none());
        assert!(decode_duration(&[0x00; 2]).is_none());
    }

    #[test]
    fn undefined_all_ones_time_is_rejected() {
        assert!(decode_time(&[0xFF; 5]).is_none());
        assert!(decode_duration(&[0xFF; 3]).is_none());
    }

    #[test]
    fn non_bcd_digits_are_rejected() {
        // Hex digit in the hours byte.
        assert!(decode_time(&[0xC0, 0x79, 0x1A, 0x00, 0x00]).is_none());
        assert!(decode_duration(&[0x01, 0xA5, 0x00]).is_none());
    }
}
