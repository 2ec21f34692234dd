//! APDU exchange with a hardware device.
//!
//! The physical link (USB HID, BLE, a speculos socket) is abstracted behind
//! [`DeviceTransport`]; this module owns command framing and status words.

use async_trait::async_trait;
use thiserror::Error;

/// Class byte of the signing app.
pub const CLA: u8 = 0xE0;
/// Instruction: get public key and address.
pub const INS_GET_ADDRESS: u8 = 0x02;
/// Instruction: sign transaction.
pub const INS_SIGN: u8 = 0x04;
/// P1 for the first frame of a request.
pub const P1_FIRST: u8 = 0x00;
/// P1 for continuation frames.
pub const P1_MORE: u8 = 0x80;

/// Status word for success.
pub const SW_OK: u16 = 0x9000;
/// Status word when the user refuses on the device.
pub const SW_USER_REJECTED: u16 = 0x6985;

/// Failures reported by the device or its link.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// The link dropped mid-request.
    #[error("Device disconnected: {0}")]
    Disconnected(String),

    /// The user refused the request on the device.
    #[error("Request rejected on device")]
    Rejected,

    /// No response within the link's timeout.
    #[error("Device did not respond in time")]
    Timeout,

    /// Any other non-success status word.
    #[error("Device returned status {0:#06x}")]
    Status(u16),

    /// Response too short or otherwise unparsable.
    #[error("Malformed device response: {0}")]
    Malformed(String),
}

/// A bulk link that carries one command APDU and returns the raw response
/// (data followed by a two-byte status word).
#[async_trait]
pub trait DeviceTransport: Send + Sync {
    async fn exchange(&self, apdu: &[u8]) -> Result<Vec<u8>, DeviceError>;
}

/// Encode a short command APDU.
pub fn encode_apdu(cla: u8, ins: u8, p1: u8, p2: u8, data: &[u8]) -> Result<Vec<u8>, DeviceError> {
    let len = u8::try_from(data.len())
        .map_err(|_| DeviceError::Malformed(format!("APDU data of {} bytes", data.len())))?;
    let mut apdu = Vec::with_capacity(5 + data.len());
    apdu.extend_from_slice(&[cla, ins, p1, p2, len]);
    apdu.extend_from_slice(data);
    Ok(apdu)
}

/// Split a response into data and status word, mapping failures.
pub fn check_status(response: &[u8]) -> Result<&[u8], DeviceError> {
    if response.len() < 2 {
        return Err(DeviceError::Malformed(format!(
            "{} byte response has no status word",
            response.len()
        )));
    }
    let (data, sw) = response.split_at(response.len() - 2);
    match u16::from_be_bytes([sw[0], sw[1]]) {
        SW_OK => Ok(data),
        SW_USER_REJECTED => Err(DeviceError::Rejected),
        other => Err(DeviceError::Status(other)),
    }
}

/// Send one command and return its response data.
pub async fn send(
    transport: &dyn DeviceTransport,
    ins: u8,
    p1: u8,
    p2: u8,
    data: &[u8],
) -> Result<Vec<u8>, DeviceError> {
    let apdu = encode_apdu(CLA, ins, p1, p2, data)?;
    let response = transport.exchange(&apdu).await?;
    check_status(&response).map(<[u8]>::to_vec)
}
