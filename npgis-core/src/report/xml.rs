//! XML fragments for fiscal reports.
pub mod schema;

use super::{DailySummaryReport, FiscalReport, RegistrationReport, TransactionReport};
use crate::config::ConfigError;
use quick_xml::{
    Writer,
    events::{BytesEnd, BytesStart, BytesText, Event},
};
use schema::{ElementSchema, FieldValue};
use std::{fmt, io, str::FromStr, string::FromUtf8Error};
use thiserror::Error;

/// XML serialization error.
#[derive(Debug, Error)]
pub enum ReportXmlError {
    #[error("failed to write report XML: {0}")]
    Write(#[from] io::Error),
    #[error("report XML is not valid UTF-8: {0}")]
    Utf8(#[from] FromUtf8Error),
}

/// XML formatting options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum XmlFormat {
    #[default]
    Compact,
    Pretty {
        indent_char: char,
        indent_size: usize,
    },
}

/// How field values are embedded in element text.
///
/// `Verbatim` interpolates values as-is, so a value containing `<` or `&`
/// yields XML the regulator may reject. Systems already signing reports
/// depend on those exact bytes, so switching to `Escaped` is an explicit
/// opt-in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum XmlEscaping {
    #[default]
    Verbatim,
    Escaped,
}

impl XmlEscaping {
    pub fn as_str(&self) -> &'static str {
        match self {
            XmlEscaping::Verbatim => "verbatim",
            XmlEscaping::Escaped => "escaped",
        }
    }
}

impl fmt::Display for XmlEscaping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for XmlEscaping {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "verbatim" => Ok(XmlEscaping::Verbatim),
            "escaped" => Ok(XmlEscaping::Escaped),
            _ => Err(ConfigError::InvalidEscaping {
                input: s.to_string(),
            }),
        }
    }
}

/// Formatting plus escaping for one build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct XmlOptions {
    pub format: XmlFormat,
    pub escaping: XmlEscaping,
}

impl XmlOptions {
    pub fn compact(escaping: XmlEscaping) -> Self {
        Self {
            format: XmlFormat::Compact,
            escaping,
        }
    }

    pub fn pretty() -> Self {
        Self {
            format: XmlFormat::Pretty {
                indent_char: ' ',
                indent_size: 2,
            },
            escaping: XmlEscaping::default(),
        }
    }
}

/// Serialize a report record to its XML fragment (no declaration).
///
/// # Examples
/// ```rust
/// use npgis_core::report::{RegistrationReport, xml::ToXml};
///
/// let report = RegistrationReport {
///     tran_id: "7".into(),
///     api_source_id: "src".into(),
///     retail_station_name: "ADVATECH".into(),
///     ewura_license_no: "PRL-2010-715".into(),
///     operator_tin: "109272930".into(),
///     operator_vrn: "40005334W".into(),
///     operator_name: "OMBOZA".into(),
///     tra_serial_no: "10TZ176714".into(),
///     region_name: "Dar es Salaam".into(),
///     district_name: "Ilala".into(),
///     ward_name: "Kariakoo".into(),
///     zone: "East".into(),
///     contact_person_email: "ops@advatech.co.tz".into(),
///     contact_person_phone: "0755000111".into(),
/// };
/// let xml = report.to_xml().unwrap();
/// assert!(xml.starts_with("<RetailStationRegistration><TranId>7</TranId>"));
/// ```
pub trait ToXml {
    fn to_xml_with(&self, options: XmlOptions) -> Result<String, ReportXmlError>;

    fn to_xml(&self) -> Result<String, ReportXmlError> {
        self.to_xml_with(XmlOptions::default())
    }

    fn to_xml_pretty(&self) -> Result<String, ReportXmlError> {
        self.to_xml_with(XmlOptions::pretty())
    }
}

impl ToXml for RegistrationReport {
    fn to_xml_with(&self, options: XmlOptions) -> Result<String, ReportXmlError> {
        write_document(&schema::REGISTRATION, self, options)
    }
}

impl ToXml for TransactionReport {
    fn to_xml_with(&self, options: XmlOptions) -> Result<String, ReportXmlError> {
        write_document(&schema::TRANSACTION, self, options)
    }
}

impl ToXml for DailySummaryReport {
    fn to_xml_with(&self, options: XmlOptions) -> Result<String, ReportXmlError> {
        write_document(&schema::DAILY_SUMMARY, self, options)
    }
}

impl ToXml for FiscalReport {
    fn to_xml_with(&self, options: XmlOptions) -> Result<String, ReportXmlError> {
        match self {
            FiscalReport::Registration(r) => r.to_xml_with(options),
            FiscalReport::Transaction(r) => r.to_xml_with(options),
            FiscalReport::DailySummary(r) => r.to_xml_with(options),
        }
    }
}

/// Compact fragment of `report` with the given escaping mode.
pub fn build(report: &FiscalReport, escaping: XmlEscaping) -> Result<String, ReportXmlError> {
    report.to_xml_with(XmlOptions::compact(escaping))
}

fn write_document<T: 'static>(
    schema: &ElementSchema<T>,
    record: &T,
    options: XmlOptions,
) -> Result<String, ReportXmlError> {
    let buffer = Vec::with_capacity(1024);
    let mut writer = match options.format {
        XmlFormat::Compact => Writer::new(buffer),
        XmlFormat::Pretty {
            indent_char,
            indent_size,
        } => Writer::new_with_indent(buffer, u8::try_from(indent_char).unwrap_or(b' '), indent_size),
    };
    write_element(&mut writer, schema, record, options.escaping)?;
    Ok(String::from_utf8(writer.into_inner())?)
}

fn write_element<T: 'static>(
    writer: &mut Writer<Vec<u8>>,
    schema: &ElementSchema<T>,
    record: &T,
    escaping: XmlEscaping,
) -> io::Result<()> {
    writer.write_event(Event::Start(BytesStart::new(schema.root())))?;
    for field in schema.fields() {
        match (field.value)(record) {
            FieldValue::Text(value) => write_text(writer, field.tag, value, escaping)?,
            FieldValue::Optional(value) => {
                write_text(writer, field.tag, value.unwrap_or_default(), escaping)?
            }
            FieldValue::Owned(value) => write_text(writer, field.tag, &value, escaping)?,
            FieldValue::Number(value) => write_text(writer, field.tag, &decimal(value), escaping)?,
            FieldValue::Count(value) => write_text(writer, field.tag, &value.to_string(), escaping)?,
            FieldValue::Tanks(tanks) => {
                writer.write_event(Event::Start(BytesStart::new(field.tag)))?;
                for tank in tanks {
                    write_element(writer, &schema::TANK, tank, escaping)?;
                }
                writer.write_event(Event::End(BytesEnd::new(field.tag)))?;
            }
        }
    }
    writer.write_event(Event::End(BytesEnd::new(schema.root())))
}

// Always emits start and end tags, so absent values stay `<Tag></Tag>`.
/// Shortest round-trip decimal; `-0.0` prints as `0`.
fn decimal(value: f64) -> String {
    let value = if value == 0.0 { 0.0 } else { value };
    value.to_string()
}

fn write_text(
    writer: &mut Writer<Vec<u8>>,
    tag: &str,
    value: &str,
    escaping: XmlEscaping,
) -> io::Result<()> {
    let text = match escaping {
        XmlEscaping::Verbatim => BytesText::from_escaped(value),
        XmlEscaping::Escaped => BytesText::new(value),
    };
    writer.write_event(Event::Start(BytesStart::new(tag)))?;
    writer.write_event(Event::Text(text))?;
    writer.write_event(Event::End(BytesEnd::new(tag)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::TankInventoryEntry;
    use chrono::{NaiveDate, NaiveTime};

    fn transaction() -> TransactionReport {
        TransactionReport {
            tran_id: "1".into(),
            api_source_id: "X".into(),
            rct_verification_code: "V".into(),
            ewura_license_no: "L".into(),
            rct_date: NaiveDate::from_ymd_opt(2025, 7, 18).unwrap(),
            rct_time: NaiveTime::from_hms_opt(11, 8, 18).unwrap(),
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
            buyer_name: None,
            card_desc: None,
        }
    }

    #[test]
    fn numbers_use_shortest_decimal_form() {
        let xml = transaction().to_xml().unwrap();
        assert!(xml.contains("<UnitPrice>2700</UnitPrice><Volume>3.5</Volume>"));
        assert!(xml.contains("<DiscountAmount>0</DiscountAmount>"));
    }

    #[test]
    fn negative_zero_prints_as_zero() {
        assert_eq!(decimal(-0.0), "0");
        assert_eq!(decimal(0.0), "0");
        assert_eq!(decimal(-10.0), "-10");
    }

    #[test]
    fn dates_use_receipt_formats() {
        let xml = transaction().to_xml().unwrap();
        assert!(xml.contains("<RctDate>18/07/2025</RctDate><RctTime>11:08:18</RctTime>"));
    }

    #[test]
    fn absent_optionals_are_empty_elements() {
        let xml = transaction().to_xml().unwrap();
        assert!(xml.ends_with(
            "<BuyerName></BuyerName><CardDesc></CardDesc></RetailerSaleTransaction>"
        ));
    }

    #[test]
    fn verbatim_keeps_markup_characters() {
        let mut report = transaction();
        report.operator_name = "A&B <Ltd>".into();
        let verbatim = report.to_xml().unwrap();
        assert!(verbatim.contains("<OperatorName>A&B <Ltd></OperatorName>"));

        let escaped = report
            .to_xml_with(XmlOptions::compact(XmlEscaping::Escaped))
            .unwrap();
        assert!(escaped.contains("<OperatorName>A&amp;B &lt;Ltd&gt;</OperatorName>"));
    }

    #[test]
    fn pretty_output_keeps_text_tight() {
        let xml = transaction().to_xml_pretty().unwrap();
        assert!(xml.starts_with("<RetailerSaleTransaction>\n  <TranId>1</TranId>\n"));
        assert!(xml.contains("\n  <BuyerName></BuyerName>\n"));
    }

    #[test]
    fn tank_rows_nest_inside_inventory() {
        let tank =
            TankInventoryEntry::from_readings("T1", "PETROL", 2, 10000.0, 5000.0, 4000.0, 10990.0);
        let mut buffer = Writer::new(Vec::new());
        write_element(&mut buffer, &schema::TANK, &tank, XmlEscaping::Verbatim).unwrap();
        let xml = String::from_utf8(buffer.into_inner()).unwrap();
        assert_eq!(
            xml,
            "<Tank><TankID>T1</TankID><ProductName>PETROL</ProductName><SaleNumber>2</SaleNumber>\
             <StartVolume>10000</StartVolume><DeliveryVolume>5000</DeliveryVolume>\
             <SaleVolume>4000</SaleVolume><MeasuredEndVolume>10990</MeasuredEndVolume>\
             <CalculatedEndVolume>11000</CalculatedEndVolume>\
             <VolumeDifference>-10</VolumeDifference></Tank>"
        );
    }

    #[test]
    fn escaping_parses_from_config_strings() {
        assert_eq!("Escaped".parse::<XmlEscaping>(), Ok(XmlEscaping::Escaped));
        assert_eq!(" verbatim ".parse::<XmlEscaping>(), Ok(XmlEscaping::Verbatim));
        assert_eq!(
            "html".parse::<XmlEscaping>(),
            Err(ConfigError::InvalidEscaping {
                input: "html".into()
            })
        );
    }
}
