mod common;

use npgis_core::canonical::canonicalize;
use npgis_core::report::xml::{self, ToXml, XmlEscaping, XmlOptions, schema};
use npgis_core::report::{FiscalReport, FuelGrade, GradeSubtotal};

/// Child element names of the root, in document order.
fn child_tags(xml: &str, root: &str) -> Vec<String> {
    let body = xml
        .strip_prefix(&format!("<{root}>"))
        .and_then(|rest| rest.strip_suffix(&format!("</{root}>")))
        .expect("root element");
    let mut tags = Vec::new();
    let mut depth = 0usize;
    let mut rest = body;
    while let Some(start) = rest.find('<') {
        let end = rest[start..].find('>').expect("tag end") + start;
        let tag = &rest[start + 1..end];
        if tag.starts_with('/') {
            depth -= 1;
        } else {
            if depth == 0 {
                tags.push(tag.to_string());
            }
            depth += 1;
        }
        rest = &rest[end + 1..];
    }
    tags
}

#[test]
fn transaction_fragment_matches_schema_order_exactly() {
    let report = common::sample_transaction();
    let xml = report.to_xml().expect("xml");
    assert_eq!(xml, common::EXPECTED_TRANSACTION);

    let expected: Vec<_> = schema::TRANSACTION.tags().map(String::from).collect();
    assert_eq!(child_tags(&xml, "RetailerSaleTransaction"), expected);
}

#[test]
fn rebuilding_gives_identical_canonical_bytes() {
    let report = FiscalReport::from(common::sample_summary());
    let first = canonicalize(&report.to_xml().expect("xml"));
    let second = canonicalize(&report.to_xml().expect("xml"));
    assert_eq!(first, second);

    let pretty = canonicalize(&report.to_xml_pretty().expect("pretty xml"));
    assert_eq!(first, pretty);
}

#[test]
fn negative_zero_discount_signs_like_zero() {
    let mut report = common::sample_transaction();
    report.discount_amount = -0.0;
    assert!(report.discount_amount.is_sign_negative());
    assert_eq!(report.validate(), Ok(()));

    let xml = report.to_xml().expect("xml");
    assert!(xml.contains("<DiscountAmount>0</DiscountAmount>"));
    assert_eq!(
        canonicalize(&xml),
        canonicalize(&common::sample_transaction().to_xml().expect("xml"))
    );
}

#[test]
fn absent_optionals_are_written_as_empty_elements() {
    let mut report = common::sample_transaction();
    report.buyer_name = None;
    report.card_desc = None;
    let xml = report.to_xml().expect("xml");
    assert!(xml.contains("<AmountNew>9450</AmountNew><BuyerName></BuyerName><CardDesc></CardDesc>"));
    assert_eq!(
        child_tags(&xml, "RetailerSaleTransaction").len(),
        schema::TRANSACTION.fields().len()
    );
}

#[test]
fn registration_follows_its_own_order() {
    let xml = common::sample_registration().to_xml().expect("xml");
    let expected: Vec<_> = schema::REGISTRATION.tags().map(String::from).collect();
    assert_eq!(child_tags(&xml, "RetailStationRegistration"), expected);
    assert!(xml.contains("<LicenseeTraSerialNo>10TZ176714</LicenseeTraSerialNo>"));
    assert!(!xml.contains("<RctDate>"));
}

#[test]
fn summary_nests_tanks_in_inventory_wrapper() {
    let summary = common::sample_summary();
    let xml = summary.to_xml().expect("xml");

    let expected: Vec<_> = schema::DAILY_SUMMARY.tags().map(String::from).collect();
    assert_eq!(child_tags(&xml, "StationDaySummaryReport"), expected);

    let inventory_start = xml.find("<TankInventory>").expect("inventory open");
    let inventory_end = xml.find("</TankInventory>").expect("inventory close");
    let inventory = &xml[inventory_start + "<TankInventory>".len()..inventory_end];
    assert_eq!(inventory.matches("<Tank>").count(), 2);
    assert!(inventory.starts_with(
        "<Tank><TankID>T1</TankID><ProductName>PETROL</ProductName><SaleNumber>120</SaleNumber>"
    ));
    assert!(inventory.contains("<CalculatedEndVolume>11000</CalculatedEndVolume><VolumeDifference>-10</VolumeDifference>"));
    assert!(xml.ends_with("</TankInventory></StationDaySummaryReport>"));
}

#[test]
fn summary_writes_all_three_grades_flat() {
    let mut summary = common::sample_summary();
    summary.grades.remove(&FuelGrade::Diesel);
    summary.grades.insert(
        FuelGrade::Kerosene,
        GradeSubtotal {
            volume: 12.25,
            transactions: 1,
            unit_price: 2500.0,
            amount: 30625.0,
        },
    );
    let xml = summary.to_xml().expect("xml");
    assert!(xml.contains(
        "<PetrolTotalVolume>4000</PetrolTotalVolume>\
         <DieselTotalVolume>0</DieselTotalVolume>\
         <KeroseneTotalVolume>12.25</KeroseneTotalVolume>"
    ));
    assert!(xml.contains("<DieselNoOfTransactions>0</DieselNoOfTransactions>"));
    assert!(xml.contains("<KerosenePrice>2500</KerosenePrice>"));
    assert!(xml.contains("<StartDate>2025-07-18</StartDate><EndDate>2025-07-18</EndDate>"));
}

#[test]
fn escaping_toggle_changes_only_markup_characters() {
    let mut report = common::sample_transaction();
    report.buyer_name = Some("JUMA & SONS".into());
    let report = FiscalReport::from(report);

    let verbatim = xml::build(&report, XmlEscaping::Verbatim).expect("verbatim");
    assert!(verbatim.contains("<BuyerName>JUMA & SONS</BuyerName>"));

    let escaped = xml::build(&report, XmlEscaping::Escaped).expect("escaped");
    assert!(escaped.contains("<BuyerName>JUMA &amp; SONS</BuyerName>"));

    let plain = FiscalReport::from(common::sample_transaction());
    assert_eq!(
        plain.to_xml_with(XmlOptions::compact(XmlEscaping::Verbatim)).expect("xml"),
        plain.to_xml_with(XmlOptions::compact(XmlEscaping::Escaped)).expect("xml"),
    );
}
