use serde::{Deserialize, Deserializer, Serialize};

/// The scanner's complete result document. Field names are the wire
/// contract and must stay byte-for-byte stable.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScanResponse {
    #[serde(default)]
    pub interface: Option<String>,
    #[serde(rename = "myip", default)]
    pub my_ip: Option<String>,
    #[serde(default)]
    pub network: Option<String>,
    // Emission order is meaningful; duplicates pass through untouched.
    #[serde(default, deserialize_with = "null_to_default")]
    pub devices: Vec<Device>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Device {
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub mac: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default, deserialize_with = "null_to_default")]
    pub open_ports: Vec<u16>,
    #[serde(default)]
    pub guessed_type: Option<String>,
}

impl Device {
    pub fn open_ports_display(&self) -> String {
        if self.open_ports.is_empty() {
            "None".to_string()
        } else {
            self.open_ports
                .iter()
                .map(|port| port.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        }
    }
}

// The scanner emits `null` where it has nothing to report; that decodes
// to the empty value rather than failing.
fn null_to_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    let value = Option::<T>::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}
