//! SOAP 1.2 envelope codec
//!
//! Outbound only: every response fragment is wrapped in the same envelope,
//! which declares all service prefixes whether or not the fragment uses them.

/// SOAP 1.2 envelope namespace
pub const SOAP_ENV_NS: &str = "http://www.w3.org/2003/05/soap-envelope";
/// ONVIF device service
pub const TDS_NS: &str = "http://www.onvif.org/ver10/device/wsdl";
/// ONVIF media service
pub const TRT_NS: &str = "http://www.onvif.org/ver10/media/wsdl";
/// ONVIF PTZ service
pub const TPTZ_NS: &str = "http://www.onvif.org/ver20/ptz/wsdl";

/// Content type the transport must send with every envelope
pub const SOAP_CONTENT_TYPE: &str = "application/soap+xml; charset=utf-8";

/// Wrap an operation fragment in a complete SOAP envelope.
///
/// The fragment is inserted verbatim inside `SOAP-ENV:Body`.
pub fn wrap(body: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <SOAP-ENV:Envelope xmlns:SOAP-ENV=\"{SOAP_ENV_NS}\" \
         xmlns:tds=\"{TDS_NS}\" \
         xmlns:trt=\"{TRT_NS}\" \
         xmlns:tptz=\"{TPTZ_NS}\">\n\
         <SOAP-ENV:Body>\n{body}</SOAP-ENV:Body>\n\
         </SOAP-ENV:Envelope>"
    )
}

/// SOAP fault fragment (not yet wrapped)
pub fn fault_fragment(code: &str, reason: &str) -> String {
    format!(
        "<SOAP-ENV:Fault>\n\
         <SOAP-ENV:Code>\n\
         <SOAP-ENV:Value>{}</SOAP-ENV:Value>\n\
         </SOAP-ENV:Code>\n\
         <SOAP-ENV:Reason>\n\
         <SOAP-ENV:Text>{}</SOAP-ENV:Text>\n\
         </SOAP-ENV:Reason>\n\
         </SOAP-ENV:Fault>",
        crate::templates::xml_escape(code),
        crate::templates::xml_escape(reason)
    )
}

/// Complete fault envelope
pub fn fault(code: &str, reason: &str) -> String {
    wrap(&fault_fragment(code, reason))
}

#[cfg(test)]
pub(crate) mod test_support {
    use quick_xml::events::Event;
    use quick_xml::name::ResolveResult;
    use quick_xml::NsReader;

    /// Shape of a parsed envelope
    #[derive(Debug, Default)]
    pub struct EnvelopeShape {
        pub roots: Vec<String>,
        pub body_count: usize,
    }

    /// Parse `xml` strictly, panicking on any syntax error or unbound prefix.
    pub fn parse_envelope(xml: &str) -> EnvelopeShape {
        let mut reader = NsReader::from_str(xml);
        let mut shape = EnvelopeShape::default();
        let mut depth = 0usize;

        loop {
            let (ns, event) = reader
                .read_resolved_event()
                .unwrap_or_else(|e| panic!("malformed XML: {e}\n{xml}"));

            match event {
                Event::Start(ref e) | Event::Empty(ref e) => {
                    assert!(
                        !matches!(ns, ResolveResult::Unknown(_)),
                        "unbound prefix on <{}>",
                        String::from_utf8_lossy(e.name().as_ref())
                    );
                    let local = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                    if depth == 0 {
                        shape.roots.push(local.clone());
                    }
                    if depth == 1 && local == "Body" {
                        shape.body_count += 1;
                    }
                    if matches!(event, Event::Start(_)) {
                        depth += 1;
                    }
                }
                Event::End(_) => depth -= 1,
                Event::Eof => break,
                _ => {}
            }
        }

        assert_eq!(depth, 0, "unclosed elements");
        shape
    }

    /// Assert a single Envelope root holding exactly one Body
    pub fn assert_envelope(xml: &str) {
        let shape = parse_envelope(xml);
        assert_eq!(shape.roots, vec!["Envelope".to_string()]);
        assert_eq!(shape.body_count, 1);
    }

    /// Text content of the first element with the given qualified name
    pub fn element_text(xml: &str, qname: &str) -> Option<String> {
        let open = format!("<{qname}>");
        let close = format!("</{qname}>");
        let start = xml.find(&open)? + open.len();
        let end = xml[start..].find(&close)? + start;
        Some(xml[start..end].to_string())
    }
}
