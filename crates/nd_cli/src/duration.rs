use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Durations like `45m`, `1h15m` or `1d 12h`. A bare number is seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HumanDuration(pub Duration);

fn unit_seconds(unit: char) -> Option<u64> {
    match unit {
        's' => Some(1),
        'm' => Some(60),
        'h' => Some(3600),
        'd' => Some(86400),
        _ => None,
    }
}

impl FromStr for HumanDuration {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut total: u64 = 0;
        let mut digits = String::new();
        let mut parts = 0;

        for c in s.chars() {
            if c.is_ascii_digit() {
                digits.push(c);
                continue;
            }
            if c.is_whitespace() {
                continue;
            }
            let multiplier = unit_seconds(c).ok_or_else(|| format!("Invalid duration unit: {}", c))?;
            if digits.is_empty() {
                return Err(format!("Unit {} has no number before it", c));
            }
            let value: u64 = digits.parse().map_err(|_| format!("Number too large: {}", digits))?;
            total = value
                .checked_mul(multiplier)
                .and_then(|secs| total.checked_add(secs))
                .ok_or_else(|| "Duration overflows".to_string())?;
            digits.clear();
            parts += 1;
        }

        if !digits.is_empty() {
            let value: u64 = digits.parse().map_err(|_| format!("Number too large: {}", digits))?;
            total = total.checked_add(value).ok_or_else(|| "Duration overflows".to_string())?;
            parts += 1;
        }

        if parts == 0 {
            return Err("Duration must include a number".to_string());
        }
        Ok(HumanDuration(Duration::from_secs(total)))
    }
}

impl fmt::Display for HumanDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut secs = self.0.as_secs();
        if secs == 0 {
            return f.write_str("0s");
        }
        for (unit, size) in [('d', 86400), ('h', 3600), ('m', 60), ('s', 1)] {
            if secs >= size {
                write!(f, "{}{}", secs / size, unit)?;
                secs %= size;
            }
        }
        Ok(())
    }
}
