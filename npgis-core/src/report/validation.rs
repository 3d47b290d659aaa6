//! Pre-build checks on report records.
//!
//! Only structural problems are reported here: blank required fields,
//! non-finite or negative quantities, and tank rows whose derived volumes do
//! not agree with their readings. Whether totals reconcile with individual
//! sales is left to the back office.
use super::{
    DailySummaryReport, FuelGrade, RegistrationReport, TankInventoryEntry, TransactionReport,
};
use thiserror::Error;

/// Tolerance for derived tank volumes, in litres.
pub const VOLUME_EPSILON: f64 = 0.01;

/// Structured validation error with field-level issues.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("report validation failed: {}", summarize(.issues))]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationError {
    pub fn new(issues: Vec<ValidationIssue>) -> Self {
        Self { issues }
    }

    pub fn has_issue(&self, field: ReportField, kind: ValidationKind) -> bool {
        self.issues
            .iter()
            .any(|issue| issue.field == field && issue.kind == kind)
    }
}

fn summarize(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|issue| match issue.tank_index {
            Some(index) => format!("{:?} {:?} (tank #{index})", issue.field, issue.kind),
            None => format!("{:?} {:?}", issue.field, issue.kind),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Single validation issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationIssue {
    pub field: ReportField,
    pub kind: ValidationKind,
    pub tank_index: Option<usize>,
}

#[non_exhaustive]
/// Field associated with a validation issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportField {
    TranId,
    ApiSourceId,
    RctVerificationCode,
    EwuraLicenseNo,
    OperatorTin,
    OperatorVrn,
    OperatorName,
    RetailStationName,
    TraSerialNo,
    RegionName,
    DistrictName,
    WardName,
    Zone,
    ContactPersonEmail,
    ContactPersonPhone,
    ProductName,
    UnitPrice,
    Volume,
    Amount,
    DiscountAmount,
    AmountNew,
    ReportId,
    EndDate,
    TotalNetAmount,
    TotalDiscount,
    TotalAmount,
    TotalVolume,
    GradeVolume(FuelGrade),
    GradeUnitPrice(FuelGrade),
    GradeAmount(FuelGrade),
    TankId,
    TankProductName,
    StartVolume,
    DeliveryVolume,
    SaleVolume,
    MeasuredEndVolume,
    CalculatedEndVolume,
    VolumeDifference,
}

#[non_exhaustive]
/// Classification of validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationKind {
    Empty,
    InvalidFormat,
    OutOfRange,
    Mismatch,
}

#[derive(Default)]
struct Issues {
    issues: Vec<ValidationIssue>,
    tank_index: Option<usize>,
}

impl Issues {
    fn push(&mut self, field: ReportField, kind: ValidationKind) {
        self.issues.push(ValidationIssue {
            field,
            kind,
            tank_index: self.tank_index,
        });
    }

    fn text(&mut self, field: ReportField, value: &str) {
        if value.trim().is_empty() {
            self.push(field, ValidationKind::Empty);
        }
    }

    // Quantities and money: finite and not negative.
    fn quantity(&mut self, field: ReportField, value: f64) {
        if !value.is_finite() || value < 0.0 {
            self.push(field, ValidationKind::OutOfRange);
        }
    }

    fn finite(&mut self, field: ReportField, value: f64) {
        if !value.is_finite() {
            self.push(field, ValidationKind::OutOfRange);
        }
    }

    fn matches(&mut self, field: ReportField, actual: f64, expected: f64) {
        if actual.is_finite() && expected.is_finite() && (actual - expected).abs() > VOLUME_EPSILON
        {
            self.push(field, ValidationKind::Mismatch);
        }
    }

    fn finish(self) -> Result<(), ValidationError> {
        if self.issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(self.issues))
        }
    }
}

impl RegistrationReport {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Issues::default();
        issues.text(ReportField::TranId, &self.tran_id);
        issues.text(ReportField::ApiSourceId, &self.api_source_id);
        issues.text(ReportField::RetailStationName, &self.retail_station_name);
        issues.text(ReportField::EwuraLicenseNo, &self.ewura_license_no);
        issues.text(ReportField::OperatorTin, &self.operator_tin);
        issues.text(ReportField::OperatorVrn, &self.operator_vrn);
        issues.text(ReportField::OperatorName, &self.operator_name);
        issues.text(ReportField::TraSerialNo, &self.tra_serial_no);
        issues.text(ReportField::RegionName, &self.region_name);
        issues.text(ReportField::DistrictName, &self.district_name);
        issues.text(ReportField::WardName, &self.ward_name);
        issues.text(ReportField::Zone, &self.zone);
        issues.text(ReportField::ContactPersonEmail, &self.contact_person_email);
        issues.text(ReportField::ContactPersonPhone, &self.contact_person_phone);
        if !self.contact_person_email.trim().is_empty() && !looks_like_email(&self.contact_person_email)
        {
            issues.push(ReportField::ContactPersonEmail, ValidationKind::InvalidFormat);
        }
        issues.finish()
    }
}

fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !value.contains(char::is_whitespace)
        }
        None => false,
    }
}

impl TransactionReport {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Issues::default();
        issues.text(ReportField::TranId, &self.tran_id);
        issues.text(ReportField::ApiSourceId, &self.api_source_id);
        issues.text(ReportField::RctVerificationCode, &self.rct_verification_code);
        issues.text(ReportField::EwuraLicenseNo, &self.ewura_license_no);
        issues.text(ReportField::OperatorTin, &self.operator_tin);
        issues.text(ReportField::OperatorVrn, &self.operator_vrn);
        issues.text(ReportField::OperatorName, &self.operator_name);
        issues.text(ReportField::RetailStationName, &self.retail_station_name);
        issues.text(ReportField::TraSerialNo, &self.tra_serial_no);
        issues.text(ReportField::ProductName, &self.product_name);
        issues.quantity(ReportField::UnitPrice, self.unit_price);
        issues.quantity(ReportField::Volume, self.volume);
        issues.quantity(ReportField::Amount, self.amount);
        issues.quantity(ReportField::DiscountAmount, self.discount_amount);
        issues.quantity(ReportField::AmountNew, self.amount_new);
        issues.finish()
    }
}

impl DailySummaryReport {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Issues::default();
        issues.text(ReportField::TranId, &self.tran_id);
        issues.text(ReportField::ApiSourceId, &self.api_source_id);
        issues.text(ReportField::EwuraLicenseNo, &self.ewura_license_no);
        issues.text(ReportField::RetailStationName, &self.retail_station_name);
        issues.text(ReportField::TraSerialNo, &self.tra_serial_no);
        issues.text(ReportField::ReportId, &self.report_id);
        if self.end_date < self.start_date {
            issues.push(ReportField::EndDate, ValidationKind::OutOfRange);
        }
        issues.quantity(ReportField::TotalNetAmount, self.total_net_amount);
        issues.quantity(ReportField::TotalDiscount, self.total_discount);
        issues.quantity(ReportField::TotalAmount, self.total_amount);
        issues.quantity(ReportField::TotalVolume, self.total_volume);
        for grade in FuelGrade::ALL {
            let subtotal = self.grade(grade);
            issues.quantity(ReportField::GradeVolume(grade), subtotal.volume);
            issues.quantity(ReportField::GradeUnitPrice(grade), subtotal.unit_price);
            issues.quantity(ReportField::GradeAmount(grade), subtotal.amount);
        }
        issues.text(ReportField::RegionName, &self.region_name);
        issues.text(ReportField::DistrictName, &self.district_name);
        issues.text(ReportField::WardName, &self.ward_name);

        for (index, tank) in self.tank_inventory.iter().enumerate() {
            issues.tank_index = Some(index);
            tank.collect_issues(&mut issues);
        }
        issues.tank_index = None;
        issues.finish()
    }
}

impl TankInventoryEntry {
    /// Check readings and the two derived volumes.
    ///
    /// # Errors
    /// Returns [`ValidationKind::Mismatch`] on `CalculatedEndVolume` when it is
    /// not `start + delivered - sold`, and on `VolumeDifference` when it is not
    /// `measured - calculated`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Issues::default();
        self.collect_issues(&mut issues);
        issues.finish()
    }

    fn collect_issues(&self, issues: &mut Issues) {
        issues.text(ReportField::TankId, &self.tank_id);
        issues.text(ReportField::TankProductName, &self.product_name);
        issues.quantity(ReportField::StartVolume, self.start_volume);
        issues.quantity(ReportField::DeliveryVolume, self.delivery_volume);
        issues.quantity(ReportField::SaleVolume, self.sale_volume);
        issues.quantity(ReportField::MeasuredEndVolume, self.measured_end_volume);
        issues.finite(ReportField::CalculatedEndVolume, self.calculated_end_volume);
        issues.finite(ReportField::VolumeDifference, self.volume_difference);
        issues.matches(
            ReportField::CalculatedEndVolume,
            self.calculated_end_volume,
            self.expected_calculated_end_volume(),
        );
        issues.matches(
            ReportField::VolumeDifference,
            self.volume_difference,
            self.expected_volume_difference(),
        );
    }
}
