use chrono::{NaiveDate, NaiveTime};
use npgis_core::config::Config;
use npgis_core::report::{
    DailySummaryReport, FuelGrade, GradeSubtotal, RegistrationReport, TankInventoryEntry,
    TransactionReport,
};
use secrecy::SecretString;
use std::collections::BTreeMap;
use std::path::PathBuf;

pub const KEYSTORE_PASSPHRASE: &str = "npgis-test";

#[allow(dead_code)]
pub fn keystore_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/keystores")
        .join(name)
}

#[allow(dead_code)]
pub fn keystore_bytes(name: &str) -> Vec<u8> {
    std::fs::read(keystore_path(name)).expect("read keystore fixture")
}

#[allow(dead_code)]
pub fn passphrase() -> SecretString {
    SecretString::from(KEYSTORE_PASSPHRASE)
}

#[allow(dead_code)]
pub fn station_config() -> Config {
    Config::new(keystore_path("station.p12")).with_passphrase(passphrase())
}

#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Compact fragment of [`sample_transaction`].
#[allow(dead_code)]
pub const EXPECTED_TRANSACTION: &str = "<RetailerSaleTransaction>\
<TranId>1</TranId>\
<APISourceId>X</APISourceId>\
<RctVerificationCode>V</RctVerificationCode>\
<EWURALicenseNo>L</EWURALicenseNo>\
<RctDate>18/07/2025</RctDate>\
<RctTime>11:08:18</RctTime>\
<OperatorTin>109272930</OperatorTin>\
<OperatorVrn>40005334W</OperatorVrn>\
<OperatorName>OMBOZA</OperatorName>\
<RetailStationName>ADVATECH</RetailStationName>\
<TraSerialNo>10TZ176714</TraSerialNo>\
<ProductName>PETROL</ProductName>\
<UnitPrice>2700</UnitPrice>\
<Volume>3.5</Volume>\
<Amount>9450</Amount>\
<DiscountAmount>0</DiscountAmount>\
<AmountNew>9450</AmountNew>\
<BuyerName>JUMA</BuyerName>\
<CardDesc>NMB BANK CARD</CardDesc>\
</RetailerSaleTransaction>";

/// The sale used across the element-order tests.
#[allow(dead_code)]
pub fn sample_transaction() -> TransactionReport {
    TransactionReport {
        tran_id: "1".into(),
        api_source_id: "X".into(),
        rct_verification_code: "V".into(),
        ewura_license_no: "L".into(),
        rct_date: NaiveDate::from_ymd_opt(2025, 7, 18).expect("date"),
        rct_time: NaiveTime::from_hms_opt(11, 8, 18).expect("time"),
        operator_tin: "109272930".into(),
        operator_vrn: "40005334W".into(),
        operator_name: "OMBOZA".into(),
        retail_station_name: "ADVATECH".into(),
        tra_serial_no: "10TZ176714".into(),
        product_name: "PETROL".into(),
        unit_price: 2700.0,
        volume: 3.5,
        amount: 9450.0,
        discount_amount: 0.0,
        amount_new: 9450.0,
        buyer_name: Some("JUMA".into()),
        card_desc: Some("NMB BANK CARD".into()),
    }
}

#[allow(dead_code)]
pub fn sample_registration() -> RegistrationReport {
    RegistrationReport {
        tran_id: "2".into(),
        api_source_id: "109272930_SPAdv2023".into(),
        retail_station_name: "ADVATECH FILLING STATION".into(),
        ewura_license_no: "PRL-2010-715".into(),
        operator_tin: "109272930".into(),
        operator_vrn: "40005334W".into(),
        operator_name: "ADVATECH OFFICE SUPPLIES".into(),
        tra_serial_no: "10TZ176714".into(),
        region_name: "Dar es Salaam".into(),
        district_name: "Ilala".into(),
        ward_name: "Kariakoo".into(),
        zone: "East".into(),
        contact_person_email: "ops@advatech.co.tz".into(),
        contact_person_phone: "0755000111".into(),
    }
}

#[allow(dead_code)]
pub fn sample_summary() -> DailySummaryReport {
    let mut grades = BTreeMap::new();
    grades.insert(
        FuelGrade::Petrol,
        GradeSubtotal {
            volume: 4000.0,
            transactions: 120,
            unit_price: 2700.0,
            amount: 10_800_000.0,
        },
    );
    grades.insert(
        FuelGrade::Diesel,
        GradeSubtotal {
            volume: 1500.5,
            transactions: 40,
            unit_price: 2900.0,
            amount: 4_351_450.0,
        },
    );

    DailySummaryReport {
        tran_id: "3".into(),
        api_source_id: "109272930_SPAdv2023".into(),
        ewura_license_no: "PRL-2010-715".into(),
        retail_station_name: "ADVATECH FILLING STATION".into(),
        tra_serial_no: "10TZ176714".into(),
        report_id: "RPT-20250718".into(),
        report_no: 198,
        start_date: NaiveDate::from_ymd_opt(2025, 7, 18).expect("date"),
        end_date: NaiveDate::from_ymd_opt(2025, 7, 18).expect("date"),
        total_transactions: 160,
        total_net_amount: 15_151_450.0,
        total_discount: 0.0,
        total_amount: 15_151_450.0,
        total_volume: 5500.5,
        grades,
        number_of_tanks: 2,
        region_name: "Dar es Salaam".into(),
        district_name: "Ilala".into(),
        ward_name: "Kariakoo".into(),
        tank_inventory: vec![
            TankInventoryEntry::from_readings("T1", "PETROL", 120, 10000.0, 5000.0, 4000.0, 10990.0),
            TankInventoryEntry::from_readings("T2", "DIESEL", 40, 8000.0, 0.0, 1500.5, 6499.5),
        ],
    }
}
