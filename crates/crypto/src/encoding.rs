//! Serde helpers for binary fields carried as text.

/// Serialize `Vec<u8>` fields as standard base64 strings.
///
/// ```
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Blob {
///     #[serde(with = "nimbus_crypto::encoding::base64_bytes")]
///     data: Vec<u8>,
/// }
///
/// let json = serde_json::to_string(&Blob { data: vec![1, 2, 3] }).unwrap();
/// assert_eq!(json, r#"{"data":"AQID"}"#);
/// ```
pub mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<T, S>(bytes: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: AsRef<[u8]> + ?Sized,
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes.as_ref()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        STANDARD
            .decode(text.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
