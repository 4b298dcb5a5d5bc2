use crate::utils::error::RecordError;
use serde::{Deserialize, Serialize};

/// 解析時讀到的最後一個欄位索引 + 1
pub const MIN_FIELDS: usize = 11;

const SERVICE_COUNT: usize = 8;
const ESTIMATED_CHARGE: usize = 9;
const TOTAL_PAYMENT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// One outpatient-service row: a provider's volume and charges for one APC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRecord {
    pub apc_code: String,
    pub provider_id: String,
    pub provider_name: String,
    pub provider_street_address: String,
    pub provider_city: String,
    pub provider_state: String,
    pub provider_zip_code: String,
    /// Hospital Referral Region
    pub provider_region: String,
    pub service_count: i64,
    pub average_estimated_charge: f64,
    pub average_total_payment: f64,
    #[serde(flatten)]
    location: Option<Coordinates>,
}

impl ServiceRecord {
    /// Single-line postal address handed to the geocoder.
    pub fn address(&self) -> String {
        format!(
            "{}, {}, {}, {}",
            self.provider_street_address,
            self.provider_city,
            self.provider_state,
            self.provider_zip_code
        )
    }

    pub fn location(&self) -> Option<Coordinates> {
        self.location
    }

    /// 座標只在地理編碼成功後設定一次，因此消耗 self 回傳新的紀錄
    pub fn with_location(self, location: Coordinates) -> Self {
        Self {
            location: Some(location),
            ..self
        }
    }
}

/// NaN 與 inf 會被序列化成 null，視同格式錯誤
fn parse_amount(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Builds a [`ServiceRecord`] from one positional CSV row.
///
/// Fields past index 10 are ignored. The three numeric columns are checked in
/// order (service count, estimated charge, total payment) and the first one
/// that fails to parse is reported.
pub fn parse_service_record<S: AsRef<str>>(row: &[S]) -> Result<ServiceRecord, RecordError> {
    if row.len() < MIN_FIELDS {
        return Err(RecordError::TooFewFields {
            expected: MIN_FIELDS,
            found: row.len(),
        });
    }

    let field = move |i: usize| row[i].as_ref();

    let service_count =
        field(SERVICE_COUNT)
            .parse::<i64>()
            .map_err(|_| RecordError::InvalidServiceCount {
                value: field(SERVICE_COUNT).to_string(),
            })?;
    let average_estimated_charge =
        parse_amount(field(ESTIMATED_CHARGE)).ok_or_else(|| {
            RecordError::InvalidEstimatedCharge {
                value: field(ESTIMATED_CHARGE).to_string(),
            }
        })?;
    let average_total_payment = parse_amount(field(TOTAL_PAYMENT)).ok_or_else(|| {
        RecordError::InvalidTotalPayment {
            value: field(TOTAL_PAYMENT).to_string(),
        }
    })?;

    Ok(ServiceRecord {
        apc_code: field(0).to_string(),
        provider_id: field(1).to_string(),
        provider_name: field(2).to_string(),
        provider_street_address: field(3).to_string(),
        provider_city: field(4).to_string(),
        provider_state: field(5).to_string(),
        provider_zip_code: field(6).to_string(),
        provider_region: field(7).to_string(),
        service_count,
        average_estimated_charge,
        average_total_payment,
        location: None,
    })
}
