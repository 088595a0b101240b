use serde::{Deserialize, Deserializer, Serialize};
use sfg_common::Credits;

use crate::ProviderApiError;

/// The vendors quote decimal prices as strings. Parse one into whole hundredths of a credit.
pub fn parse_vendor_price(price: &str) -> Result<i64, ProviderApiError> {
    let mut parts = price.trim().split('.');
    let whole_units = parts
        .next()
        .ok_or_else(|| ProviderApiError::InvalidCurrencyAmount(price.to_string()))?
        .parse::<i64>()
        .map_err(|e| ProviderApiError::InvalidCurrencyAmount(format!("Invalid price value: {price}. {e}.")))?;
    let cents = parts
        .next()
        .map(|s| {
            // "9.5" means 9.50, not 9.05
            let padded = format!("{s:0<2}");
            padded[..2].parse::<i64>()
        })
        .unwrap_or(Ok(0))
        .map_err(|e| ProviderApiError::InvalidCurrencyAmount(format!("Invalid price value: {price}. {e}.")))?;
    Ok(100 * whole_units + cents)
}

/// A price field as it appears on the wire. Some vendors send numbers, some send strings,
/// and some switch between the two depending on the endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawPrice {
    Number(f64),
    Text(String),
}

impl RawPrice {
    pub fn to_credits(&self) -> Result<Credits, ProviderApiError> {
        match self {
            RawPrice::Number(n) => {
                if !n.is_finite() {
                    return Err(ProviderApiError::InvalidCurrencyAmount(format!("{n}")));
                }
                #[allow(clippy::cast_possible_truncation)]
                Ok(Credits::from((n * 100.0).round() as i64))
            },
            RawPrice::Text(s) => parse_vendor_price(s).map(Credits::from),
        }
    }
}

/// Deserialize an identifier that may arrive as a JSON number or string.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where D: Deserializer<'de> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i64),
        Text(String),
    }
    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n.to_string()),
        Raw::Text(s) => Ok(s),
    }
}

/// Optional variant of [`string_or_number`].
pub(crate) fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where D: Deserializer<'de> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i64),
        Text(String),
    }
    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Number(n) => n.to_string(),
        Raw::Text(s) => s,
    }))
}

/// Decode a JSON response body, turning HTTP-level failures into [`ProviderApiError`]s.
pub(crate) async fn read_json_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ProviderApiError> {
    if response.status().is_success() {
        response.json::<T>().await.map_err(|e| ProviderApiError::JsonError(e.to_string()))
    } else {
        let status = response.status().as_u16();
        let message = response.text().await.map_err(|e| ProviderApiError::ResponseError(e.to_string()))?;
        Err(ProviderApiError::QueryError { status, message })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_prices() {
        assert_eq!(parse_vendor_price("60").unwrap(), 6000);
        assert_eq!(parse_vendor_price("60.00").unwrap(), 6000);
        assert_eq!(parse_vendor_price("9.5").unwrap(), 950);
        assert_eq!(parse_vendor_price("0.05").unwrap(), 5);
        assert!(parse_vendor_price("sixty").is_err());
    }

    #[test]
    fn raw_price_forms() {
        let n: RawPrice = serde_json::from_str("25.5").unwrap();
        assert_eq!(n.to_credits().unwrap(), Credits::from(2550));
        let t: RawPrice = serde_json::from_str("\"25.50\"").unwrap();
        assert_eq!(t.to_credits().unwrap(), Credits::from(2550));
    }
}
