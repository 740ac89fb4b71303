use anyhow::{anyhow, Result};

const MIN_SECRET_LEN: usize = 16;

pub fn validate_http_url(field: &str, value: &str) -> Result<()> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("{} must not be empty", field));
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(anyhow!("{} must be an http(s) url", field));
    }
    Ok(())
}

pub fn validate_secret(field: &str, value: &str) -> Result<()> {
    if value.trim().len() < MIN_SECRET_LEN {
        return Err(anyhow!(
            "{} must be at least {} characters",
            field,
            MIN_SECRET_LEN
        ));
    }
    Ok(())
}

pub fn validate_fee_bps(field: &str, value: u32) -> Result<()> {
    if value > 10_000 {
        return Err(anyhow!("{} must be between 0 and 10000", field));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_need_a_scheme() {
        assert!(validate_http_url("x", "https://eventhaiti.com").is_ok());
        assert!(validate_http_url("x", "eventhaiti.com").is_err());
        assert!(validate_http_url("x", " ").is_err());
    }

    #[test]
    fn short_secrets_are_rejected() {
        assert!(validate_secret("s", "short").is_err());
        assert!(validate_secret("s", "0123456789abcdef").is_ok());
    }
}
