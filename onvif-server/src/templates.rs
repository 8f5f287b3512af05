//! ONVIF SOAP response builders
//!
//! Each builder renders the operation-specific fragment that goes inside
//! `SOAP-ENV:Body`. Wrapping is done by [`crate::envelope::wrap`].

use quick_xml::escape::escape;

use crate::clock::UtcDateTime;
use crate::device::{DeviceIdentity, MediaProfile};

/// Escape a string for safe inclusion in XML content/attributes.
/// Converts &, <, >, ", ' to their XML entity equivalents.
pub fn xml_escape(s: &str) -> String {
    escape(s).to_string()
}

/// Host and ports embedded in XAddr and stream URIs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertisedAddress {
    pub host: String,
    /// SOAP listening port
    pub port: u16,
    /// RTSP port, `port + 1` when unset
    pub rtsp_port: Option<u16>,
    pub stream_path: String,
}

impl AdvertisedAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            rtsp_port: None,
            stream_path: "stream1".to_string(),
        }
    }

    /// Explicit RTSP port, else `port + 1`. At port 65535 there is no next
    /// port and this returns 65535 itself; configuration rejects that case.
    pub fn rtsp_port(&self) -> u16 {
        self.rtsp_port.unwrap_or(self.port.saturating_add(1))
    }

    /// `http://<host>:<port>/onvif/<service>_service`
    pub fn service_url(&self, service: &str) -> String {
        format!("http://{}:{}/onvif/{}_service", self.host, self.port, service)
    }

    pub fn stream_uri(&self) -> String {
        format!(
            "rtsp://{}:{}/{}",
            self.host,
            self.rtsp_port(),
            self.stream_path.trim_start_matches('/')
        )
    }
}

impl Default for AdvertisedAddress {
    fn default() -> Self {
        Self::new("localhost", 8080)
    }
}

/// GetDeviceInformation response
pub fn get_device_information(identity: &DeviceIdentity) -> String {
    format!(
        "<tds:GetDeviceInformationResponse>\n\
         <tds:Manufacturer>{}</tds:Manufacturer>\n\
         <tds:Model>{}</tds:Model>\n\
         <tds:FirmwareVersion>{}</tds:FirmwareVersion>\n\
         <tds:SerialNumber>{}</tds:SerialNumber>\n\
         <tds:HardwareId>{}</tds:HardwareId>\n\
         </tds:GetDeviceInformationResponse>",
        xml_escape(&identity.manufacturer),
        xml_escape(&identity.model),
        xml_escape(&identity.firmware_version),
        xml_escape(&identity.serial_number),
        xml_escape(&identity.uuid)
    )
}

/// GetCapabilities response: Device, Media and PTZ blocks with fixed feature flags
pub fn get_capabilities(address: &AdvertisedAddress) -> String {
    format!(
        "<tds:GetCapabilitiesResponse>\n\
         <tds:Capabilities>\n\
         <tds:Device>\n\
         <tds:XAddr>{device}</tds:XAddr>\n\
         <tds:Network>\n\
         <tds:IPFilter>false</tds:IPFilter>\n\
         <tds:ZeroConfiguration>false</tds:ZeroConfiguration>\n\
         <tds:IPVersion6>false</tds:IPVersion6>\n\
         <tds:DynDNS>false</tds:DynDNS>\n\
         </tds:Network>\n\
         <tds:System>\n\
         <tds:DiscoveryResolve>false</tds:DiscoveryResolve>\n\
         <tds:DiscoveryBye>false</tds:DiscoveryBye>\n\
         <tds:RemoteDiscovery>false</tds:RemoteDiscovery>\n\
         <tds:SystemBackup>false</tds:SystemBackup>\n\
         <tds:SystemLogging>false</tds:SystemLogging>\n\
         <tds:FirmwareUpgrade>false</tds:FirmwareUpgrade>\n\
         </tds:System>\n\
         <tds:IO>\n\
         <tds:InputConnectors>0</tds:InputConnectors>\n\
         <tds:RelayOutputs>0</tds:RelayOutputs>\n\
         </tds:IO>\n\
         <tds:Security>\n\
         <tds:TLS1.1>false</tds:TLS1.1>\n\
         <tds:TLS1.2>true</tds:TLS1.2>\n\
         <tds:OnboardKeyGeneration>false</tds:OnboardKeyGeneration>\n\
         <tds:AccessPolicyConfig>false</tds:AccessPolicyConfig>\n\
         <tds:X.509Token>false</tds:X.509Token>\n\
         <tds:SAMLToken>false</tds:SAMLToken>\n\
         <tds:KerberosToken>false</tds:KerberosToken>\n\
         <tds:RELToken>false</tds:RELToken>\n\
         </tds:Security>\n\
         </tds:Device>\n\
         <tds:Media>\n\
         <tds:XAddr>{media}</tds:XAddr>\n\
         <tds:StreamingCapabilities>\n\
         <tds:RTPMulticast>false</tds:RTPMulticast>\n\
         <tds:RTP_TCP>true</tds:RTP_TCP>\n\
         <tds:RTP_RTSP_TCP>true</tds:RTP_RTSP_TCP>\n\
         </tds:StreamingCapabilities>\n\
         </tds:Media>\n\
         <tds:PTZ>\n\
         <tds:XAddr>{ptz}</tds:XAddr>\n\
         </tds:PTZ>\n\
         </tds:Capabilities>\n\
         </tds:GetCapabilitiesResponse>",
        device = xml_escape(&address.service_url("device")),
        media = xml_escape(&address.service_url("media")),
        ptz = xml_escape(&address.service_url("ptz")),
    )
}

/// One `trt:Profiles` entry
fn profile_entry(profile: &MediaProfile) -> String {
    format!(
        "<trt:Profiles token=\"{token}\" fixed=\"true\">\n\
         <trt:Name>{name}</trt:Name>\n\
         <trt:VideoSourceConfiguration token=\"VideoSource_1\" fixed=\"true\">\n\
         <trt:Name>VideoSourceConfig</trt:Name>\n\
         <trt:UseCount>2</trt:UseCount>\n\
         <trt:SourceToken>VideoSource_1</trt:SourceToken>\n\
         <trt:Bounds x=\"0\" y=\"0\" width=\"{width}\" height=\"{height}\"/>\n\
         </trt:VideoSourceConfiguration>\n\
         <trt:VideoEncoderConfiguration token=\"{encoder}\" fixed=\"true\">\n\
         <trt:Name>VideoEncoderConfig</trt:Name>\n\
         <trt:UseCount>1</trt:UseCount>\n\
         <trt:Encoding>H264</trt:Encoding>\n\
         <trt:Resolution>\n\
         <trt:Width>{width}</trt:Width>\n\
         <trt:Height>{height}</trt:Height>\n\
         </trt:Resolution>\n\
         <trt:Quality>1</trt:Quality>\n\
         <trt:RateControl>\n\
         <trt:FrameRateLimit>{framerate}</trt:FrameRateLimit>\n\
         <trt:EncodingInterval>1</trt:EncodingInterval>\n\
         <trt:BitrateLimit>{bitrate}</trt:BitrateLimit>\n\
         </trt:RateControl>\n\
         <trt:H264>\n\
         <trt:GovLength>30</trt:GovLength>\n\
         <trt:H264Profile>Baseline</trt:H264Profile>\n\
         </trt:H264>\n\
         </trt:VideoEncoderConfiguration>\n\
         </trt:Profiles>\n",
        token = xml_escape(&profile.token),
        name = xml_escape(&profile.name),
        encoder = xml_escape(&profile.video_encoder_token),
        width = profile.width,
        height = profile.height,
        framerate = profile.framerate,
        bitrate = profile.bitrate,
    )
}

/// GetProfiles response, one entry per profile in the given order
pub fn get_profiles(profiles: &[MediaProfile]) -> String {
    let entries: String = profiles.iter().map(profile_entry).collect();
    format!("<trt:GetProfilesResponse>\n{}</trt:GetProfilesResponse>", entries)
}

/// GetStreamUri response
pub fn get_stream_uri(address: &AdvertisedAddress) -> String {
    format!(
        "<trt:GetStreamUriResponse>\n\
         <trt:MediaUri>\n\
         <trt:Uri>{}</trt:Uri>\n\
         <trt:InvalidAfterConnect>false</trt:InvalidAfterConnect>\n\
         <trt:InvalidAfterReboot>false</trt:InvalidAfterReboot>\n\
         <trt:Timeout>PT60S</trt:Timeout>\n\
         </trt:MediaUri>\n\
         </trt:GetStreamUriResponse>",
        xml_escape(&address.stream_uri())
    )
}

/// GetSystemDateAndTime response (manual time, UTC zone, no DST)
pub fn get_system_date_and_time(now: &UtcDateTime) -> String {
    format!(
        "<tds:GetSystemDateAndTimeResponse>\n\
         <tds:SystemDateAndTime>\n\
         <tds:DateTimeType>Manual</tds:DateTimeType>\n\
         <tds:DaylightSavings>false</tds:DaylightSavings>\n\
         <tds:TimeZone>\n\
         <tds:TZ>UTC</tds:TZ>\n\
         </tds:TimeZone>\n\
         <tds:UTCDateTime>\n\
         <tds:Time>\n\
         <tds:Hour>{}</tds:Hour>\n\
         <tds:Minute>{}</tds:Minute>\n\
         <tds:Second>{}</tds:Second>\n\
         </tds:Time>\n\
         <tds:Date>\n\
         <tds:Year>{}</tds:Year>\n\
         <tds:Month>{}</tds:Month>\n\
         <tds:Day>{}</tds:Day>\n\
         </tds:Date>\n\
         </tds:UTCDateTime>\n\
         </tds:SystemDateAndTime>\n\
         </tds:GetSystemDateAndTimeResponse>",
        now.hour, now.minute, now.second, now.year, now.month, now.day
    )
}

/// PTZ GetConfigurations response
pub fn get_configurations() -> &'static str {
    "<tptz:GetConfigurationsResponse>\n\
     <tptz:PTZConfiguration token=\"PTZConfig_1\">\n\
     <tptz:Name>PTZ Configuration</tptz:Name>\n\
     <tptz:UseCount>1</tptz:UseCount>\n\
     <tptz:NodeToken>PTZNode_1</tptz:NodeToken>\n\
     <tptz:DefaultAbsolutePantTiltPositionSpace>http://www.onvif.org/ver10/tptz/PanTiltSpaces/PositionGenericSpace</tptz:DefaultAbsolutePantTiltPositionSpace>\n\
     <tptz:DefaultAbsoluteZoomPositionSpace>http://www.onvif.org/ver10/tptz/ZoomSpaces/PositionGenericSpace</tptz:DefaultAbsoluteZoomPositionSpace>\n\
     <tptz:DefaultRelativePanTiltTranslationSpace>http://www.onvif.org/ver10/tptz/PanTiltSpaces/TranslationGenericSpace</tptz:DefaultRelativePanTiltTranslationSpace>\n\
     <tptz:DefaultRelativeZoomTranslationSpace>http://www.onvif.org/ver10/tptz/ZoomSpaces/TranslationGenericSpace</tptz:DefaultRelativeZoomTranslationSpace>\n\
     <tptz:DefaultContinuousPanTiltVelocitySpace>http://www.onvif.org/ver10/tptz/PanTiltSpaces/VelocityGenericSpace</tptz:DefaultContinuousPanTiltVelocitySpace>\n\
     <tptz:DefaultContinuousZoomVelocitySpace>http://www.onvif.org/ver10/tptz/ZoomSpaces/VelocityGenericSpace</tptz:DefaultContinuousZoomVelocitySpace>\n\
     <tptz:DefaultPTZSpeed>\n\
     <tptz:PanTilt x=\"1.0\" y=\"1.0\" space=\"http://www.onvif.org/ver10/tptz/PanTiltSpaces/GenericSpeedSpace\"/>\n\
     <tptz:Zoom x=\"1.0\" space=\"http://www.onvif.org/ver10/tptz/ZoomSpaces/ZoomGenericSpeedSpace\"/>\n\
     </tptz:DefaultPTZSpeed>\n\
     <tptz:DefaultPTZTimeout>PT5S</tptz:DefaultPTZTimeout>\n\
     <tptz:PanTiltLimits>\n\
     <tptz:Range>\n\
     <tptz:URI>http://www.onvif.org/ver10/tptz/PanTiltSpaces/PositionGenericSpace</tptz:URI>\n\
     <tptz:XRange>\n\
     <tptz:Min>-1.0</tptz:Min>\n\
     <tptz:Max>1.0</tptz:Max>\n\
     </tptz:XRange>\n\
     <tptz:YRange>\n\
     <tptz:Min>-1.0</tptz:Min>\n\
     <tptz:Max>1.0</tptz:Max>\n\
     </tptz:YRange>\n\
     </tptz:Range>\n\
     </tptz:PanTiltLimits>\n\
     <tptz:ZoomLimits>\n\
     <tptz:Range>\n\
     <tptz:URI>http://www.onvif.org/ver10/tptz/ZoomSpaces/PositionGenericSpace</tptz:URI>\n\
     <tptz:XRange>\n\
     <tptz:Min>0.0</tptz:Min>\n\
     <tptz:Max>1.0</tptz:Max>\n\
     </tptz:XRange>\n\
     </tptz:Range>\n\
     </tptz:ZoomLimits>\n\
     </tptz:PTZConfiguration>\n\
     </tptz:GetConfigurationsResponse>"
}
