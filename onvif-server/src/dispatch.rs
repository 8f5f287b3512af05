//! Operation classification and dispatch
//!
//! Request text in, SOAP envelope out. Dispatch never fails: anything that
//! cannot be classified gets a Receiver fault.

use std::fmt;
use std::sync::Arc;

use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;
use serde::{Deserialize, Serialize};

use crate::clock::ClockMode;
use crate::device::DeviceProfileStore;
use crate::envelope;
use crate::templates::{self, AdvertisedAddress};

/// Fault code for operations this device does not implement
pub const NOT_IMPLEMENTED_CODE: &str = "SOAP-ENV:Receiver";
/// Fault reason for operations this device does not implement
pub const NOT_IMPLEMENTED_REASON: &str = "Method not implemented";

/// ONVIF operation named by a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GetDeviceInformation,
    GetCapabilities,
    GetProfiles,
    GetStreamUri,
    GetSystemDateAndTime,
    PtzGetConfigurations,
    Unrecognized,
}

impl Operation {
    /// Recognized operations in match precedence order
    pub const RECOGNIZED: [Operation; 6] = [
        Operation::GetDeviceInformation,
        Operation::GetCapabilities,
        Operation::GetProfiles,
        Operation::GetStreamUri,
        Operation::GetSystemDateAndTime,
        Operation::PtzGetConfigurations,
    ];

    /// Element name as it appears on the wire
    pub fn name(self) -> &'static str {
        match self {
            Operation::GetDeviceInformation => "GetDeviceInformation",
            Operation::GetCapabilities => "GetCapabilities",
            Operation::GetProfiles => "GetProfiles",
            Operation::GetStreamUri => "GetStreamUri",
            Operation::GetSystemDateAndTime => "GetSystemDateAndTime",
            Operation::PtzGetConfigurations => "GetConfigurations",
            Operation::Unrecognized => "Unrecognized",
        }
    }

    fn from_element(name: &str) -> Operation {
        Operation::RECOGNIZED
            .into_iter()
            .find(|op| op.name() == name)
            .unwrap_or(Operation::Unrecognized)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a request body is mapped to an [`Operation`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchPolicy {
    /// First operation name found anywhere in the text wins, in
    /// [`Operation::RECOGNIZED`] order. Tolerates any prefix or framing,
    /// but also matches names that only appear in headers or values.
    #[default]
    Substring,
    /// Only the local name of the first element inside the SOAP Body counts.
    Element,
}

/// Classify by literal substring, first match in precedence order wins
pub fn classify(body: &str) -> Operation {
    Operation::RECOGNIZED
        .into_iter()
        .find(|op| body.contains(op.name()))
        .unwrap_or(Operation::Unrecognized)
}

/// Classify by the first element inside `Body`
pub fn classify_element(body: &str) -> Operation {
    match extract_soap_action(body) {
        Some(action) => Operation::from_element(&action),
        None => Operation::Unrecognized,
    }
}

/// Extract the local name of the first element inside the SOAP Body.
///
/// Only a `Body` that is a direct child of the root `Envelope` counts. Both
/// must be in the SOAP 1.2 envelope namespace or carry an undeclared prefix.
/// Returns `None` for malformed XML, a missing or empty Body, or a root that
/// is not an Envelope.
pub fn extract_soap_action(xml: &str) -> Option<String> {
    let mut reader = NsReader::from_str(xml);
    let mut depth = 0usize;
    let mut in_body = false;

    loop {
        match reader.read_resolved_event() {
            Ok((ns, Event::Start(e))) => {
                let local_name = e.local_name();
                match depth {
                    0 if !is_soap_element(&ns, local_name.as_ref(), b"Envelope") => return None,
                    1 if is_soap_element(&ns, local_name.as_ref(), b"Body") => in_body = true,
                    2 if in_body => {
                        return Some(String::from_utf8_lossy(local_name.as_ref()).to_string())
                    }
                    _ => {}
                }
                depth += 1;
            }
            Ok((ns, Event::Empty(e))) => {
                let local_name = e.local_name();
                match depth {
                    // Empty root or empty Body: nothing to dispatch
                    0 => return None,
                    1 if is_soap_element(&ns, local_name.as_ref(), b"Body") => return None,
                    2 if in_body => {
                        return Some(String::from_utf8_lossy(local_name.as_ref()).to_string())
                    }
                    _ => {}
                }
            }
            Ok((_, Event::End(_))) => {
                depth = depth.saturating_sub(1);
                if depth == 1 && in_body {
                    return None;
                }
                if depth == 0 {
                    return None;
                }
            }
            Ok((_, Event::Eof)) => break,
            Err(_) => break,
            _ => {}
        }
    }

    None
}

/// Local name matches and the prefix is either the SOAP 1.2 namespace or undeclared
fn is_soap_element(ns: &ResolveResult<'_>, local_name: &[u8], expected: &[u8]) -> bool {
    if local_name != expected {
        return false;
    }
    match ns {
        ResolveResult::Bound(Namespace(uri)) => *uri == envelope::SOAP_ENV_NS.as_bytes(),
        ResolveResult::Unbound | ResolveResult::Unknown(_) => true,
    }
}

/// Stateless request handler for the emulated device.
///
/// Cheap to clone; all clones share the same read-only store.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    store: Arc<DeviceProfileStore>,
    address: AdvertisedAddress,
    policy: DispatchPolicy,
    clock: ClockMode,
}

impl Dispatcher {
    pub fn new(store: Arc<DeviceProfileStore>, address: AdvertisedAddress) -> Self {
        Self {
            store,
            address,
            policy: DispatchPolicy::default(),
            clock: ClockMode::default(),
        }
    }

    pub fn with_policy(mut self, policy: DispatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_clock(mut self, clock: ClockMode) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &DeviceProfileStore {
        &self.store
    }

    pub fn address(&self) -> &AdvertisedAddress {
        &self.address
    }

    pub fn policy(&self) -> DispatchPolicy {
        self.policy
    }

    pub fn clock(&self) -> ClockMode {
        self.clock
    }

    pub fn classify(&self, body: &str) -> Operation {
        match self.policy {
            DispatchPolicy::Substring => classify(body),
            DispatchPolicy::Element => classify_element(body),
        }
    }

    /// Render the full envelope for an already classified operation
    pub fn respond(&self, operation: Operation) -> String {
        let fragment = match operation {
            Operation::Unrecognized => {
                return envelope::fault(NOT_IMPLEMENTED_CODE, NOT_IMPLEMENTED_REASON)
            }
            Operation::GetDeviceInformation => {
                templates::get_device_information(self.store.identity())
            }
            Operation::GetCapabilities => templates::get_capabilities(&self.address),
            Operation::GetProfiles => templates::get_profiles(self.store.profiles()),
            Operation::GetStreamUri => templates::get_stream_uri(&self.address),
            Operation::GetSystemDateAndTime => {
                templates::get_system_date_and_time(&self.clock.now())
            }
            Operation::PtzGetConfigurations => templates::get_configurations().to_string(),
        };
        envelope::wrap(&fragment)
    }

    /// Classify `body` and build the response envelope
    pub fn dispatch(&self, body: &str) -> String {
        let operation = self.classify(body);
        if operation == Operation::Unrecognized {
            tracing::warn!("Unrecognized ONVIF request ({} bytes)", body.len());
        } else {
            tracing::info!("ONVIF {}", operation);
        }
        tracing::debug!("Request body:\n{}", body);
        self.respond(operation)
    }

    /// Dispatch a raw buffer; invalid UTF-8 is replaced rather than rejected
    pub fn dispatch_bytes(&self, body: &[u8]) -> String {
        self.dispatch(&String::from_utf8_lossy(body))
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(
            Arc::new(DeviceProfileStore::default()),
            AdvertisedAddress::default(),
        )
    }
}
