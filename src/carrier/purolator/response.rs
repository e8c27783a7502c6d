//! Response parsing for the Purolator shipping web services

use base64::{engine::general_purpose::STANDARD, Engine as _};

use super::request::LABEL_DOCUMENT_TYPE;
use crate::carrier::traits::{CarrierError, CarrierResult};
use crate::carrier::xml::XmlElement;

/// Returned when a failed response carries no recognizable error text
pub const UNKNOWN_ERROR: &str = "Unknown error occurred";

/// Where the label bytes for a shipment can be found
#[derive(Debug, Clone, PartialEq)]
pub enum LabelDocument {
    /// Base64 payload decoded from the response
    Inline(Vec<u8>),
    /// Link the document must be downloaded from
    Url(String),
}

/// Tracking PIN from a CreateShipment response, if one was issued
pub fn extract_shipment_pin(root: &XmlElement) -> Option<String> {
    root.find("ShipmentPIN")
        .and_then(|pin| pin.child_text("Value"))
        .map(str::to_string)
}

/// Human-readable error from a failed response.
///
/// Checked in order: SOAP fault string, the first error's description, then
/// every error carrying both a code and a description as `code: description`
/// joined with `; `.
pub fn extract_error_message(root: &XmlElement) -> String {
    if let Some(fault) = root
        .find("Fault")
        .and_then(|f| f.child_text("faultstring"))
    {
        return fault.to_string();
    }

    let errors = root.find_all("Error");
    if let Some(description) = errors.first().and_then(|e| e.child_text("Description")) {
        return description.to_string();
    }

    let joined: Vec<String> = errors
        .iter()
        .filter_map(|e| Some(format!("{}: {}", e.child_text("Code")?, e.child_text("Description")?)))
        .collect();
    if joined.is_empty() {
        UNKNOWN_ERROR.to_string()
    } else {
        joined.join("; ")
    }
}

/// Error text for a raw body that may not even be XML
pub fn error_message_from_body(body: &str) -> String {
    match XmlElement::parse(body) {
        Ok(root) => extract_error_message(&root),
        Err(_) => {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                UNKNOWN_ERROR.to_string()
            } else {
                trimmed.chars().take(200).collect()
            }
        }
    }
}

/// Label location from a GetDocuments response
pub fn parse_documents(root: &XmlElement) -> CarrierResult<LabelDocument> {
    for document in root.find_all("Document") {
        if let Some(data) = document.child_text("Data") {
            let compact: String = data.chars().filter(|c| !c.is_whitespace()).collect();
            let bytes = STANDARD
                .decode(compact.as_bytes())
                .map_err(|e| CarrierError::InvalidDocument(e.to_string()))?;
            return Ok(LabelDocument::Inline(bytes));
        }

        let url = document
            .find_all("DocumentDetail")
            .into_iter()
            .filter(|d| d.child_text("DocumentType") == Some(LABEL_DOCUMENT_TYPE))
            .find_map(|d| d.child_text("URL"));
        if let Some(url) = url {
            return Ok(LabelDocument::Url(url.to_string()));
        }
    }

    Err(CarrierError::NotFound(format!(
        "no document returned: {}",
        extract_error_message(root)
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(xml: &str) -> XmlElement {
        XmlElement::parse(xml).unwrap()
    }

    #[test]
    fn test_extract_pin() {
        let root = parse(
            r#"<s:Envelope xmlns:s="urn:s"><s:Body><CreateShipmentResponse xmlns="http://purolator.com/pws/datatypes/v2">
                <ResponseInformation><Errors/></ResponseInformation>
                <ShipmentPIN><Value>329014521622</Value></ShipmentPIN>
            </CreateShipmentResponse></s:Body></s:Envelope>"#,
        );
        assert_eq!(extract_shipment_pin(&root).as_deref(), Some("329014521622"));

        let empty = parse("<Envelope><Body><ShipmentPIN><Value/></ShipmentPIN></Body></Envelope>");
        assert_eq!(extract_shipment_pin(&empty), None);
    }

    #[test]
    fn test_fault_string_wins() {
        let root = parse(
            r#"<s:Envelope xmlns:s="urn:s"><s:Body><s:Fault>
                <faultcode>s:Client</faultcode><faultstring>Invalid credentials</faultstring>
            </s:Fault></s:Body></s:Envelope>"#,
        );
        assert_eq!(extract_error_message(&root), "Invalid credentials");
    }

    #[test]
    fn test_single_and_multiple_errors() {
        let single = parse(
            "<Envelope><Errors><Error><Code>1100</Code><Description>Postal code invalid</Description></Error></Errors></Envelope>",
        );
        assert_eq!(extract_error_message(&single), "Postal code invalid");

        let many = parse(
            "<Envelope><Errors>\
             <Error><Code>1100</Code><Description>Postal code invalid</Description></Error>\
             <Error><Code>1200</Code><Description>Weight too high</Description></Error>\
             </Errors></Envelope>",
        );
        assert_eq!(extract_error_message(&many), "Postal code invalid");

        let none = parse("<Envelope><Body/></Envelope>");
        assert_eq!(extract_error_message(&none), UNKNOWN_ERROR);
    }

    #[test]
    fn test_errors_joined_when_first_has_no_description() {
        let root = parse(
            "<Envelope><Errors>\
             <Error><Code>3001</Code></Error>\
             <Error><Code>1200</Code><Description>Weight too high</Description></Error>\
             <Error><Description>No code</Description></Error>\
             </Errors></Envelope>",
        );
        assert_eq!(extract_error_message(&root), "1200: Weight too high");

        let bare = parse("<Envelope><Errors><Error><Code>3001</Code></Error></Errors></Envelope>");
        assert_eq!(extract_error_message(&bare), UNKNOWN_ERROR);
    }

    #[test]
    fn test_error_message_from_non_xml_body() {
        assert_eq!(error_message_from_body("Service Unavailable"), "Service Unavailable");
        assert_eq!(error_message_from_body("  "), UNKNOWN_ERROR);
    }

    #[test]
    fn test_documents_inline_and_url() {
        let inline = parse(
            "<Envelope><Documents><Document><Data>JVBERi0x\nLjQ=</Data></Document></Documents></Envelope>",
        );
        assert_eq!(
            parse_documents(&inline).unwrap(),
            LabelDocument::Inline(b"%PDF-1.4".to_vec())
        );

        let linked = parse(
            "<Envelope><Documents><Document><DocumentDetails><DocumentDetail>\
             <DocumentType>DomesticBillOfLading</DocumentType>\
             <URL>https://example.com/label.pdf</URL>\
             </DocumentDetail></DocumentDetails></Document></Documents></Envelope>",
        );
        assert_eq!(
            parse_documents(&linked).unwrap(),
            LabelDocument::Url("https://example.com/label.pdf".to_string())
        );

        let missing = parse("<Envelope><Documents/></Envelope>");
        assert!(matches!(parse_documents(&missing), Err(CarrierError::NotFound(_))));
    }
}
