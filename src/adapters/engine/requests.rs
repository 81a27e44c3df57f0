//! SOAP request bodies for the ActiveBPEL deployment and administration
//! services.

use quick_xml::escape::escape;

pub const SOAP_ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const DEPLOY_NS: &str = "http://docs.active-endpoints/wsdl/deploybpr/2007/01/deploybpr.wsdl";
pub const ADMIN_NS: &str =
    "http://docs.active-endpoints/wsdl/activebpeladmin/2007/01/activebpeladmin.wsdl";
pub const ADMIN_TYPES_NS: &str =
    "http://schemas.active-endpoints.com/activebpeladmin/2007/01/activebpeladmin.xsd";

pub const TEXT_XML: &str = "text/xml; charset=utf-8";

// process state filter value for "running"
const RUNNING_STATE: u32 = 1;

const ENVELOPE_PART_ID: &str = "deploy-envelope";

fn envelope(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<soapenv:Envelope xmlns:soapenv="{}"><soapenv:Body>{}</soapenv:Body></soapenv:Envelope>"#,
        SOAP_ENVELOPE_NS, body
    )
}

/// Lists the running instances of the process named `process_name`.
pub fn process_list_request(process_name: &str) -> String {
    envelope(&format!(
        r#"<act:getProcessListInput xmlns:act="{}" xmlns:ns="{}"><act:listFilter><ns:processName>{}</ns:processName><ns:processState>{}</ns:processState></act:listFilter></act:getProcessListInput>"#,
        ADMIN_NS,
        ADMIN_TYPES_NS,
        escape(process_name),
        RUNNING_STATE
    ))
}

pub fn terminate_process_request(pid: u64) -> String {
    envelope(&format!(
        r#"<act:terminateProcessInput xmlns:act="{}"><act:pid>{}</act:pid></act:terminateProcessInput>"#,
        ADMIN_NS, pid
    ))
}

/// A `multipart/related` SOAP-with-attachments body.
#[derive(Debug, Clone)]
pub struct MultipartBody {
    pub content_type: String,
    pub body: Vec<u8>,
}

/// `deployBpr` envelope referencing the archive, followed by the archive
/// itself as an `application/octet-stream` attachment.
pub fn deploy_request(archive_name: &str, archive: &[u8]) -> MultipartBody {
    let boundary = format!(
        "----=_Part_bpel_deploy_{}",
        chrono::Utc::now().timestamp_micros()
    );
    let attachment_id = format!("{}@bpel-deploy", archive_name);

    let soap = envelope(&format!(
        r#"<dep:deployBpr xmlns:dep="{}"><dep:bprFilename>{}</dep:bprFilename><dep:file href="cid:{}"/></dep:deployBpr>"#,
        DEPLOY_NS,
        escape(archive_name),
        escape(&attachment_id)
    ));

    let mut body = Vec::with_capacity(archive.len() + soap.len() + 512);
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Type: text/xml; charset=UTF-8\r\nContent-Transfer-Encoding: binary\r\nContent-Id: <{id}>\r\n\r\n",
            b = boundary,
            id = ENVELOPE_PART_ID
        )
        .as_bytes(),
    );
    body.extend_from_slice(soap.as_bytes());
    body.extend_from_slice(
        format!(
            "\r\n--{b}\r\nContent-Type: application/octet-stream\r\nContent-Transfer-Encoding: binary\r\nContent-Id: <{id}>\r\n\r\n",
            b = boundary,
            id = attachment_id
        )
        .as_bytes(),
    );
    body.extend_from_slice(archive);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    MultipartBody {
        content_type: format!(
            r#"multipart/related; type="text/xml"; start="<{}>"; boundary="{}""#,
            ENVELOPE_PART_ID, boundary
        ),
        body,
    }
}
