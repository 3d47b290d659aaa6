//! Fiscal report records handed over by the station back office.
pub mod validation;
pub mod xml;

pub use validation::{ReportField, ValidationError, ValidationIssue, ValidationKind};

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Discriminant of a [`FiscalReport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportKind {
    Registration,
    Transaction,
    DailySummary,
}

impl ReportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Registration => "registration",
            ReportKind::Transaction => "transaction",
            ReportKind::DailySummary => "daily_summary",
        }
    }

    /// Root element name of the report fragment.
    pub fn root_tag(&self) -> &'static str {
        match self {
            ReportKind::Registration => xml::schema::REGISTRATION.root(),
            ReportKind::Transaction => xml::schema::TRANSACTION.root(),
            ReportKind::DailySummary => xml::schema::DAILY_SUMMARY.root(),
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One report submitted to the regulator.
///
/// # Examples
/// ```rust
/// use npgis_core::report::{FiscalReport, ReportKind, RegistrationReport};
///
/// let report = FiscalReport::Registration(RegistrationReport {
///     tran_id: "1".into(),
///     api_source_id: "109272930_SPAdv2023".into(),
///     retail_station_name: "ADVATECH FILLING STATION".into(),
///     ewura_license_no: "PRL-2010-715".into(),
///     operator_tin: "109272930".into(),
///     operator_vrn: "40005334W".into(),
///     operator_name: "ADVATECH OFFICE SUPPLIES".into(),
///     tra_serial_no: "10TZ101807".into(),
///     region_name: "Dar es Salaam".into(),
///     district_name: "Ilala".into(),
///     ward_name: "Kariakoo".into(),
///     zone: "East".into(),
///     contact_person_email: "ops@advatech.co.tz".into(),
///     contact_person_phone: "0755000111".into(),
/// });
/// assert_eq!(report.kind(), ReportKind::Registration);
/// assert_eq!(report.tran_id(), "1");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "report", rename_all = "camelCase")]
pub enum FiscalReport {
    Registration(RegistrationReport),
    Transaction(TransactionReport),
    DailySummary(DailySummaryReport),
}

impl FiscalReport {
    pub fn kind(&self) -> ReportKind {
        match self {
            FiscalReport::Registration(_) => ReportKind::Registration,
            FiscalReport::Transaction(_) => ReportKind::Transaction,
            FiscalReport::DailySummary(_) => ReportKind::DailySummary,
        }
    }

    /// Caller-supplied correlation id of this submission attempt.
    pub fn tran_id(&self) -> &str {
        match self {
            FiscalReport::Registration(r) => &r.tran_id,
            FiscalReport::Transaction(r) => &r.tran_id,
            FiscalReport::DailySummary(r) => &r.tran_id,
        }
    }

    /// Check required fields and tank invariants before building.
    ///
    /// # Errors
    /// Returns every issue found, not just the first.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            FiscalReport::Registration(r) => r.validate(),
            FiscalReport::Transaction(r) => r.validate(),
            FiscalReport::DailySummary(r) => r.validate(),
        }
    }
}

impl From<RegistrationReport> for FiscalReport {
    fn from(report: RegistrationReport) -> Self {
        FiscalReport::Registration(report)
    }
}

impl From<TransactionReport> for FiscalReport {
    fn from(report: TransactionReport) -> Self {
        FiscalReport::Transaction(report)
    }
}

impl From<DailySummaryReport> for FiscalReport {
    fn from(report: DailySummaryReport) -> Self {
        FiscalReport::DailySummary(report)
    }
}

/// Retail station registration with the regulator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationReport {
    pub tran_id: String,
    pub api_source_id: String,
    pub retail_station_name: String,
    pub ewura_license_no: String,
    pub operator_tin: String,
    pub operator_vrn: String,
    pub operator_name: String,
    pub tra_serial_no: String,
    pub region_name: String,
    pub district_name: String,
    pub ward_name: String,
    pub zone: String,
    pub contact_person_email: String,
    pub contact_person_phone: String,
}

/// A single fuel sale as printed on the fiscal receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReport {
    pub tran_id: String,
    pub api_source_id: String,
    pub rct_verification_code: String,
    pub ewura_license_no: String,
    #[serde(with = "receipt_date")]
    pub rct_date: NaiveDate,
    pub rct_time: NaiveTime,
    pub operator_tin: String,
    pub operator_vrn: String,
    pub operator_name: String,
    pub retail_station_name: String,
    pub tra_serial_no: String,
    pub product_name: String,
    #[serde(deserialize_with = "lenient::number")]
    pub unit_price: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub volume: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub amount: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub discount_amount: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub amount_new: f64,
    #[serde(default)]
    pub buyer_name: Option<String>,
    #[serde(default)]
    pub card_desc: Option<String>,
}

/// Fuel grades the regulator's daily summary reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FuelGrade {
    Petrol,
    Diesel,
    Kerosene,
}

impl FuelGrade {
    pub const ALL: [FuelGrade; 3] = [FuelGrade::Petrol, FuelGrade::Diesel, FuelGrade::Kerosene];

    pub fn as_str(&self) -> &'static str {
        match self {
            FuelGrade::Petrol => "petrol",
            FuelGrade::Diesel => "diesel",
            FuelGrade::Kerosene => "kerosene",
        }
    }
}

/// Per-grade totals of a daily summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeSubtotal {
    #[serde(deserialize_with = "lenient::number")]
    pub volume: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub transactions: u64,
    #[serde(deserialize_with = "lenient::number")]
    pub unit_price: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub amount: f64,
}

/// Day-end summary of a station, including tank reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySummaryReport {
    pub tran_id: String,
    pub api_source_id: String,
    pub ewura_license_no: String,
    pub retail_station_name: String,
    pub tra_serial_no: String,
    pub report_id: String,
    #[serde(deserialize_with = "lenient::number")]
    pub report_no: u64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(deserialize_with = "lenient::number")]
    pub total_transactions: u64,
    #[serde(deserialize_with = "lenient::number")]
    pub total_net_amount: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub total_discount: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub total_amount: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub total_volume: f64,
    #[serde(default)]
    pub grades: BTreeMap<FuelGrade, GradeSubtotal>,
    #[serde(deserialize_with = "lenient::number")]
    pub number_of_tanks: u32,
    pub region_name: String,
    pub district_name: String,
    pub ward_name: String,
    #[serde(default)]
    pub tank_inventory: Vec<TankInventoryEntry>,
}

impl DailySummaryReport {
    /// Subtotal for `grade`; grades without sales report as zeros.
    pub fn grade(&self, grade: FuelGrade) -> GradeSubtotal {
        self.grades.get(&grade).copied().unwrap_or_default()
    }
}

/// Reconciliation of one storage tank over the reporting period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TankInventoryEntry {
    pub tank_id: String,
    pub product_name: String,
    #[serde(deserialize_with = "lenient::number")]
    pub sale_number: u64,
    #[serde(deserialize_with = "lenient::number")]
    pub start_volume: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub delivery_volume: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub sale_volume: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub measured_end_volume: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub calculated_end_volume: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub volume_difference: f64,
}

impl TankInventoryEntry {
    /// Build an entry from gauge readings, deriving the calculated end volume
    /// and the loss/gain difference.
    ///
    /// # Examples
    /// ```rust
    /// use npgis_core::report::TankInventoryEntry;
    ///
    /// let tank = TankInventoryEntry::from_readings("T1", "PETROL", 12, 10000.0, 5000.0, 4000.0, 10990.0);
    /// assert_eq!(tank.calculated_end_volume, 11000.0);
    /// assert_eq!(tank.volume_difference, -10.0);
    /// ```
    pub fn from_readings(
        tank_id: impl Into<String>,
        product_name: impl Into<String>,
        sale_number: u64,
        start_volume: f64,
        delivery_volume: f64,
        sale_volume: f64,
        measured_end_volume: f64,
    ) -> Self {
        let calculated_end_volume = start_volume + delivery_volume - sale_volume;
        Self {
            tank_id: tank_id.into(),
            product_name: product_name.into(),
            sale_number,
            start_volume,
            delivery_volume,
            sale_volume,
            measured_end_volume,
            calculated_end_volume,
            volume_difference: measured_end_volume - calculated_end_volume,
        }
    }

    /// `start + delivered - sold`.
    pub fn expected_calculated_end_volume(&self) -> f64 {
        self.start_volume + self.delivery_volume - self.sale_volume
    }

    /// `measured - calculated`, using the recorded calculated volume.
    pub fn expected_volume_difference(&self) -> f64 {
        self.measured_end_volume - self.calculated_end_volume
    }
}

/// Receipt dates travel as `DD/MM/YYYY`.
pub(crate) const RECEIPT_DATE_FORMAT: &str = "%d/%m/%Y";
pub(crate) const RECEIPT_TIME_FORMAT: &str = "%H:%M:%S";
pub(crate) const SUMMARY_DATE_FORMAT: &str = "%Y-%m-%d";

mod receipt_date {
    use super::RECEIPT_DATE_FORMAT;
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub(super) fn serialize<S>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&date.format(RECEIPT_DATE_FORMAT))
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        NaiveDate::parse_from_str(&raw, RECEIPT_DATE_FORMAT)
            .map_err(|e| D::Error::custom(format!("invalid receipt date '{raw}': {e}")))
    }
}

/// Back-office exports carry numbers either as JSON numbers or as decimal
/// strings (`"unitPrice":"2700"`); both deserialize to the same value.
mod lenient {
    use serde::{Deserialize, Deserializer, de::Error};
    use std::fmt::Display;
    use std::str::FromStr;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrText<T> {
        Number(T),
        Text(String),
    }

    pub(super) fn number<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de> + FromStr,
        T::Err: Display,
    {
        match NumberOrText::<T>::deserialize(deserializer)? {
            NumberOrText::Number(value) => Ok(value),
            NumberOrText::Text(raw) => raw
                .parse()
                .map_err(|e| D::Error::custom(format!("invalid number '{raw}': {e}"))),
        }
    }
}
