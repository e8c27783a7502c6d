//! Request envelopes for the Purolator shipping web services

use crate::carrier::traits::CarrierResult;
use crate::carrier::xml::SoapWriter;
use crate::domain::address::{
    format_postal_code, parse_phone_number, parse_street_address, ParseQuality, PhoneNumber,
    StreetAddress,
};
use crate::domain::ShipmentRecord;

pub const SOAP_ENV_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const SHIPPING_NS: &str = "http://purolator.com/pws/datatypes/v2";
pub const DOCUMENTS_NS: &str = "http://purolator.com/pws/datatypes/v1";

pub const CREATE_SHIPMENT_ACTION: &str = "http://purolator.com/pws/service/v2/CreateShipment";
pub const GET_DOCUMENTS_ACTION: &str = "http://purolator.com/pws/service/v1/GetDocuments";

/// Document type requested for domestic labels
pub const LABEL_DOCUMENT_TYPE: &str = "DomesticBillOfLading";

/// A built envelope plus any placeholder substitutions made along the way
#[derive(Debug, Clone)]
pub struct BuiltRequest {
    pub envelope: String,
    pub warnings: Vec<String>,
}

struct Party<'a> {
    name: &'a str,
    city: &'a str,
    province: &'a str,
    country: &'a str,
    postal: String,
    street: StreetAddress,
    phone: PhoneNumber,
}

impl<'a> Party<'a> {
    #[allow(clippy::too_many_arguments)]
    fn parse(
        role: &str,
        name: &'a str,
        street: &str,
        city: &'a str,
        province: &'a str,
        postal: &str,
        country: &'a str,
        phone: &str,
        warnings: &mut Vec<String>,
    ) -> Self {
        let street = parse_street_address(street);
        let phone = parse_phone_number(phone);
        note(warnings, role, "street", street.quality);
        note(warnings, role, "phone", phone.quality);
        Party {
            name,
            city,
            province,
            country,
            postal: format_postal_code(postal),
            street,
            phone,
        }
    }

    fn write(&self, w: &mut SoapWriter) -> CarrierResult<()> {
        w.open("v2:Address")?;
        w.leaf("v2:Name", self.name)?;
        w.leaf("v2:StreetNumber", &self.street.number)?;
        w.leaf("v2:StreetName", &self.street.name)?;
        w.leaf("v2:City", self.city)?;
        w.leaf("v2:Province", self.province)?;
        w.leaf("v2:Country", self.country)?;
        w.leaf("v2:PostalCode", &self.postal)?;
        w.open("v2:PhoneNumber")?;
        w.leaf("v2:CountryCode", &self.phone.country_code)?;
        w.leaf("v2:AreaCode", &self.phone.area_code)?;
        w.leaf("v2:Phone", &self.phone.phone)?;
        w.close("v2:PhoneNumber")?;
        w.close("v2:Address")
    }
}

fn note(warnings: &mut Vec<String>, role: &str, field: &str, quality: ParseQuality) {
    match quality {
        ParseQuality::Exact => {}
        ParseQuality::Defaulted => warnings.push(format!("{} {} completed with a default", role, field)),
        ParseQuality::Placeholder => warnings.push(format!("{} {} replaced with a placeholder", role, field)),
    }
}

fn request_context(
    w: &mut SoapWriter,
    prefix: &str,
    version: &str,
    group_id: &str,
    reference: &str,
    user_token: &str,
) -> CarrierResult<()> {
    let tag = |name: &str| format!("{}:{}", prefix, name);
    w.open("soapenv:Header")?;
    w.open(&tag("RequestContext"))?;
    w.leaf(&tag("Version"), version)?;
    w.leaf(&tag("Language"), "en")?;
    w.leaf(&tag("GroupID"), group_id)?;
    w.leaf(&tag("RequestReference"), reference)?;
    w.leaf(&tag("UserToken"), user_token)?;
    w.close(&tag("RequestContext"))?;
    w.close("soapenv:Header")
}

/// Build the CreateShipment envelope for one record.
///
/// The record is expected to have passed validation; address fields are
/// split and normalized here.
pub fn build_create_shipment(record: &ShipmentRecord, account_number: &str) -> CarrierResult<BuiltRequest> {
    let mut warnings = Vec::new();
    let sender = Party::parse(
        "Sender",
        &record.sender_name,
        &record.sender_street,
        &record.sender_city,
        &record.sender_province,
        &record.sender_postal,
        "CA",
        &record.sender_phone,
        &mut warnings,
    );
    let receiver = Party::parse(
        "Receiver",
        &record.receiver_name,
        &record.receiver_street,
        &record.receiver_city,
        &record.receiver_province,
        &record.receiver_postal,
        &record.receiver_country,
        &record.receiver_phone,
        &mut warnings,
    );

    let mut w = SoapWriter::new()?;
    w.open_with(
        "soapenv:Envelope",
        &[("xmlns:soapenv", SOAP_ENV_NS), ("xmlns:v2", SHIPPING_NS)],
    )?;
    request_context(&mut w, "v2", "2.0", "111", record.effective_reference(), "")?;

    w.open("soapenv:Body")?;
    w.open("v2:CreateShipmentRequest")?;
    w.open("v2:Shipment")?;

    w.open("v2:SenderInformation")?;
    sender.write(&mut w)?;
    w.close("v2:SenderInformation")?;

    w.open("v2:ReceiverInformation")?;
    receiver.write(&mut w)?;
    w.close("v2:ReceiverInformation")?;

    w.open("v2:PackageInformation")?;
    w.leaf("v2:ServiceID", record.service_id.trim())?;
    w.open("v2:TotalWeight")?;
    w.leaf("v2:Value", record.weight.trim())?;
    w.leaf("v2:WeightUnit", "kg")?;
    w.close("v2:TotalWeight")?;
    w.open("v2:Dimensions")?;
    w.leaf("v2:Length", record.length.trim())?;
    w.leaf("v2:Width", record.width.trim())?;
    w.leaf("v2:Height", record.height.trim())?;
    w.leaf("v2:DimensionUnit", "cm")?;
    w.close("v2:Dimensions")?;
    w.leaf("v2:TotalPieces", "1")?;
    w.close("v2:PackageInformation")?;

    w.open("v2:PaymentInformation")?;
    w.leaf("v2:PaymentType", record.payment_type.trim())?;
    w.leaf("v2:RegisteredAccountNumber", account_number)?;
    w.close("v2:PaymentInformation")?;

    w.open("v2:PickupInformation")?;
    w.leaf("v2:PickupType", "DropOff")?;
    w.close("v2:PickupInformation")?;

    w.close("v2:Shipment")?;
    w.leaf("v2:PrinterType", "Regular")?;
    w.close("v2:CreateShipmentRequest")?;
    w.close("soapenv:Body")?;
    w.close("soapenv:Envelope")?;

    Ok(BuiltRequest {
        envelope: w.finish()?,
        warnings,
    })
}

/// Build the GetDocuments envelope requesting the label for a PIN
pub fn build_get_documents(shipment_pin: &str) -> CarrierResult<String> {
    let mut w = SoapWriter::new()?;
    w.open_with(
        "soapenv:Envelope",
        &[("xmlns:soapenv", SOAP_ENV_NS), ("xmlns:v1", DOCUMENTS_NS)],
    )?;
    request_context(&mut w, "v1", "1.2", "11", "GetLabel", "")?;

    w.open("soapenv:Body")?;
    w.open("v1:GetDocumentsRequest")?;
    w.open("v1:DocumentCriterium")?;
    w.open("v1:DocumentCriteria")?;
    w.open("v1:PIN")?;
    w.leaf("v1:Value", shipment_pin)?;
    w.close("v1:PIN")?;
    w.open("v1:DocumentTypes")?;
    w.leaf("v1:DocumentType", LABEL_DOCUMENT_TYPE)?;
    w.close("v1:DocumentTypes")?;
    w.close("v1:DocumentCriteria")?;
    w.close("v1:DocumentCriterium")?;
    w.close("v1:GetDocumentsRequest")?;
    w.close("soapenv:Body")?;
    w.close("soapenv:Envelope")?;

    w.finish()
}
