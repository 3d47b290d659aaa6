//! Element order of every report document.
//!
//! The canonical bytes, and with them the signature, depend on element order,
//! so each document shape is a static table of `(tag, accessor)` pairs rather
//! than whatever order the record structs happen to declare.
use crate::report::{
    DailySummaryReport, FuelGrade, RECEIPT_DATE_FORMAT, RECEIPT_TIME_FORMAT, RegistrationReport,
    SUMMARY_DATE_FORMAT, TankInventoryEntry, TransactionReport,
};

/// Value of one element, before text escaping.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue<'a> {
    Text(&'a str),
    /// Written as an empty element when absent.
    Optional(Option<&'a str>),
    Owned(String),
    Number(f64),
    Count(u64),
    /// Nested list of `Tank` elements.
    Tanks(&'a [TankInventoryEntry]),
}

/// One child element: its tag and how to read it from the record.
pub struct FieldSpec<T: 'static> {
    pub tag: &'static str,
    pub value: for<'a> fn(&'a T) -> FieldValue<'a>,
}

/// Root tag plus ordered children of a document shape.
pub struct ElementSchema<T: 'static> {
    root: &'static str,
    fields: &'static [FieldSpec<T>],
}

impl<T: 'static> ElementSchema<T> {
    pub const fn root(&self) -> &'static str {
        self.root
    }

    pub fn fields(&self) -> &'static [FieldSpec<T>] {
        self.fields
    }

    /// Child tags in emission order.
    pub fn tags(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|field| field.tag)
    }
}

pub static REGISTRATION: ElementSchema<RegistrationReport> = ElementSchema {
    root: "RetailStationRegistration",
    fields: &[
        FieldSpec { tag: "TranId", value: |r| FieldValue::Text(&r.tran_id) },
        FieldSpec { tag: "APISourceId", value: |r| FieldValue::Text(&r.api_source_id) },
        FieldSpec { tag: "RetailStationName", value: |r| FieldValue::Text(&r.retail_station_name) },
        FieldSpec { tag: "EWURALicenseNo", value: |r| FieldValue::Text(&r.ewura_license_no) },
        FieldSpec { tag: "OperatorTin", value: |r| FieldValue::Text(&r.operator_tin) },
        FieldSpec { tag: "OperatorVrn", value: |r| FieldValue::Text(&r.operator_vrn) },
        FieldSpec { tag: "OperatorName", value: |r| FieldValue::Text(&r.operator_name) },
        FieldSpec { tag: "LicenseeTraSerialNo", value: |r| FieldValue::Text(&r.tra_serial_no) },
        FieldSpec { tag: "RegionName", value: |r| FieldValue::Text(&r.region_name) },
        FieldSpec { tag: "DistrictName", value: |r| FieldValue::Text(&r.district_name) },
        FieldSpec { tag: "WardName", value: |r| FieldValue::Text(&r.ward_name) },
        FieldSpec { tag: "Zone", value: |r| FieldValue::Text(&r.zone) },
        FieldSpec {
            tag: "ContactPersonEmailAddress",
            value: |r| FieldValue::Text(&r.contact_person_email),
        },
        FieldSpec { tag: "ContactPersonPhone", value: |r| FieldValue::Text(&r.contact_person_phone) },
    ],
};

pub static TRANSACTION: ElementSchema<TransactionReport> = ElementSchema {
    root: "RetailerSaleTransaction",
    fields: &[
        FieldSpec { tag: "TranId", value: |r| FieldValue::Text(&r.tran_id) },
        FieldSpec { tag: "APISourceId", value: |r| FieldValue::Text(&r.api_source_id) },
        FieldSpec {
            tag: "RctVerificationCode",
            value: |r| FieldValue::Text(&r.rct_verification_code),
        },
        FieldSpec { tag: "EWURALicenseNo", value: |r| FieldValue::Text(&r.ewura_license_no) },
        FieldSpec {
            tag: "RctDate",
            value: |r| FieldValue::Owned(r.rct_date.format(RECEIPT_DATE_FORMAT).to_string()),
        },
        FieldSpec {
            tag: "RctTime",
            value: |r| FieldValue::Owned(r.rct_time.format(RECEIPT_TIME_FORMAT).to_string()),
        },
        FieldSpec { tag: "OperatorTin", value: |r| FieldValue::Text(&r.operator_tin) },
        FieldSpec { tag: "OperatorVrn", value: |r| FieldValue::Text(&r.operator_vrn) },
        FieldSpec { tag: "OperatorName", value: |r| FieldValue::Text(&r.operator_name) },
        FieldSpec { tag: "RetailStationName", value: |r| FieldValue::Text(&r.retail_station_name) },
        FieldSpec { tag: "TraSerialNo", value: |r| FieldValue::Text(&r.tra_serial_no) },
        FieldSpec { tag: "ProductName", value: |r| FieldValue::Text(&r.product_name) },
        FieldSpec { tag: "UnitPrice", value: |r| FieldValue::Number(r.unit_price) },
        FieldSpec { tag: "Volume", value: |r| FieldValue::Number(r.volume) },
        FieldSpec { tag: "Amount", value: |r| FieldValue::Number(r.amount) },
        FieldSpec { tag: "DiscountAmount", value: |r| FieldValue::Number(r.discount_amount) },
        FieldSpec { tag: "AmountNew", value: |r| FieldValue::Number(r.amount_new) },
        FieldSpec { tag: "BuyerName", value: |r| FieldValue::Optional(r.buyer_name.as_deref()) },
        FieldSpec { tag: "CardDesc", value: |r| FieldValue::Optional(r.card_desc.as_deref()) },
    ],
};

// Grades stay flat: three fixed element groups regardless of which grades sold.
pub static DAILY_SUMMARY: ElementSchema<DailySummaryReport> = ElementSchema {
    root: "StationDaySummaryReport",
    fields: &[
        FieldSpec { tag: "TranId", value: |r| FieldValue::Text(&r.tran_id) },
        FieldSpec { tag: "APISourceId", value: |r| FieldValue::Text(&r.api_source_id) },
        FieldSpec { tag: "EWURALicenseNo", value: |r| FieldValue::Text(&r.ewura_license_no) },
        FieldSpec { tag: "RetailStationName", value: |r| FieldValue::Text(&r.retail_station_name) },
        FieldSpec { tag: "TraSerialNo", value: |r| FieldValue::Text(&r.tra_serial_no) },
        FieldSpec { tag: "ReportId", value: |r| FieldValue::Text(&r.report_id) },
        FieldSpec { tag: "ReportNo", value: |r| FieldValue::Count(r.report_no) },
        FieldSpec {
            tag: "StartDate",
            value: |r| FieldValue::Owned(r.start_date.format(SUMMARY_DATE_FORMAT).to_string()),
        },
        FieldSpec {
            tag: "EndDate",
            value: |r| FieldValue::Owned(r.end_date.format(SUMMARY_DATE_FORMAT).to_string()),
        },
        FieldSpec { tag: "TotalNoOfTransaction", value: |r| FieldValue::Count(r.total_transactions) },
        FieldSpec { tag: "TotalNetAmount", value: |r| FieldValue::Number(r.total_net_amount) },
        FieldSpec { tag: "TotalDiscount", value: |r| FieldValue::Number(r.total_discount) },
        FieldSpec { tag: "TotalAmount", value: |r| FieldValue::Number(r.total_amount) },
        FieldSpec { tag: "TotalVolume", value: |r| FieldValue::Number(r.total_volume) },
        FieldSpec {
            tag: "PetrolTotalVolume",
            value: |r| FieldValue::Number(r.grade(FuelGrade::Petrol).volume),
        },
        FieldSpec {
            tag: "DieselTotalVolume",
            value: |r| FieldValue::Number(r.grade(FuelGrade::Diesel).volume),
        },
        FieldSpec {
            tag: "KeroseneTotalVolume",
            value: |r| FieldValue::Number(r.grade(FuelGrade::Kerosene).volume),
        },
        FieldSpec {
            tag: "PetrolNoOfTransactions",
            value: |r| FieldValue::Count(r.grade(FuelGrade::Petrol).transactions),
        },
        FieldSpec {
            tag: "DieselNoOfTransactions",
            value: |r| FieldValue::Count(r.grade(FuelGrade::Diesel).transactions),
        },
        FieldSpec {
            tag: "KeroseneNoOfTransactions",
            value: |r| FieldValue::Count(r.grade(FuelGrade::Kerosene).transactions),
        },
        FieldSpec {
            tag: "PetrolPrice",
            value: |r| FieldValue::Number(r.grade(FuelGrade::Petrol).unit_price),
        },
        FieldSpec {
            tag: "DieselPrice",
            value: |r| FieldValue::Number(r.grade(FuelGrade::Diesel).unit_price),
        },
        FieldSpec {
            tag: "KerosenePrice",
            value: |r| FieldValue::Number(r.grade(FuelGrade::Kerosene).unit_price),
        },
        FieldSpec {
            tag: "PetrolTotalAmount",
            value: |r| FieldValue::Number(r.grade(FuelGrade::Petrol).amount),
        },
        FieldSpec {
            tag: "DieselTotalAmount",
            value: |r| FieldValue::Number(r.grade(FuelGrade::Diesel).amount),
        },
        FieldSpec {
            tag: "KeroseneTotalAmount",
            value: |r| FieldValue::Number(r.grade(FuelGrade::Kerosene).amount),
        },
        FieldSpec { tag: "NumberOfTanks", value: |r| FieldValue::Count(u64::from(r.number_of_tanks)) },
        FieldSpec { tag: "RegionName", value: |r| FieldValue::Text(&r.region_name) },
        FieldSpec { tag: "DistrictName", value: |r| FieldValue::Text(&r.district_name) },
        FieldSpec { tag: "WardName", value: |r| FieldValue::Text(&r.ward_name) },
        FieldSpec { tag: "TankInventory", value: |r| FieldValue::Tanks(&r.tank_inventory) },
    ],
};

pub static TANK: ElementSchema<TankInventoryEntry> = ElementSchema {
    root: "Tank",
    fields: &[
        FieldSpec { tag: "TankID", value: |t| FieldValue::Text(&t.tank_id) },
        FieldSpec { tag: "ProductName", value: |t| FieldValue::Text(&t.product_name) },
        FieldSpec { tag: "SaleNumber", value: |t| FieldValue::Count(t.sale_number) },
        FieldSpec { tag: "StartVolume", value: |t| FieldValue::Number(t.start_volume) },
        FieldSpec { tag: "DeliveryVolume", value: |t| FieldValue::Number(t.delivery_volume) },
        FieldSpec { tag: "SaleVolume", value: |t| FieldValue::Number(t.sale_volume) },
        FieldSpec { tag: "MeasuredEndVolume", value: |t| FieldValue::Number(t.measured_end_volume) },
        FieldSpec {
            tag: "CalculatedEndVolume",
            value: |t| FieldValue::Number(t.calculated_end_volume),
        },
        FieldSpec { tag: "VolumeDifference", value: |t| FieldValue::Number(t.volume_difference) },
    ],
};
