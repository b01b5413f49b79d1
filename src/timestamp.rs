//! Conversion of a single cue timestamp token into fractional seconds.
//!
//! Accepted shapes are `H:M:S[,.]mmm` and `M:S[,.]mmm`. Anything following
//! the first space (WebVTT cue settings, for instance) is ignored.

use nom::character::complete::{digit1, space0};
use nom::combinator::{all_consuming, map_res};
use nom::sequence::delimited;
use nom::IResult;

/// Parse a timestamp token into seconds.
///
/// A component count other than two or three yields zero for the
/// hour/minute/second part. A non-numeric component yields `NaN`, which
/// callers must treat as an unusable timestamp.
pub fn parse_timestamp(token: &str) -> f64 {
    let token = token.split(' ').next().unwrap_or_default();

    let mut parts = if token.contains(',') {
        token.split(',')
    } else {
        token.split('.')
    };
    let time = parts.next().unwrap_or_default();
    let millis = match parts.next() {
        Some(ms) if !ms.is_empty() => component(ms),
        _ => 0.0,
    };

    let hms: Vec<&str> = time.split(':').collect();
    let (hours, minutes, seconds) = match hms.as_slice() {
        [h, m, s] => (component(h), component(m), component(s)),
        [m, s] => (0.0, component(m), component(s)),
        _ => (0.0, 0.0, 0.0),
    };

    hours * 3600.0 + minutes * 60.0 + seconds + millis / 1000.0
}

fn number(input: &str) -> IResult<&str, f64> {
    map_res(delimited(space0, digit1, space0), |s: &str| s.parse::<f64>())(input)
}

fn component(input: &str) -> f64 {
    match all_consuming(number)(input) {
        Ok((_, value)) => value,
        Err(_) => f64::NAN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! test_parse_ts {
        ($($name:ident: $value:expr,)*) => {
        $(
            #[test]
            fn $name() {
                let (input, expected): (&str, f64) = $value;

                let seconds = parse_timestamp(input);

                assert!(
                    (seconds - expected).abs() < 1e-9,
                    "'{}' parsed to {}, expected {}",
                    input,
                    seconds,
                    expected
                );
            }
        )*
        }
    }

    test_parse_ts! {
        test_parse_ts_comma: ("00:01:02,500", 62.5),
        test_parse_ts_dot: ("00:01:05.000", 65.0),
        test_parse_ts_two_components: ("01:02.250", 62.25),
        test_parse_ts_no_millis: ("00:00:07", 7.0),
        test_parse_ts_empty_millis: ("00:00:01,", 1.0),
        test_parse_ts_short_millis: ("00:00:01,5", 1.005),
        test_parse_ts_unpadded: ("1:1:1,200", 3661.2),
        test_parse_ts_cue_settings: ("00:00:03.500 align:center position:50%", 3.5),
        test_parse_ts_minute_overflow: ("00:75:00,000", 4500.0),
        test_parse_ts_large_hours: ("100:00:00,001", 360_000.001),
        test_parse_ts_one_component: ("42,500", 0.5),
        test_parse_ts_four_components: ("1:00:00:00.000", 0.0),
    }

    #[test]
    fn test_parse_ts_non_numeric_is_nan() {
        assert!(parse_timestamp("00:xx:01,000").is_nan());
        assert!(parse_timestamp("00:00:01,abc").is_nan());
        assert!(parse_timestamp("00::01,000").is_nan());
    }

    #[test]
    fn test_parse_ts_first_separator_wins() {
        // With a comma present, the dot stays inside the seconds component.
        assert!(parse_timestamp("00:00:01.5,000").is_nan());
    }
}
