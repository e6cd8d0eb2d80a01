//! Read-only metadata about the most recently completed transfer.
//!
//! # Design
//! The underlying engines expose dozens of near-identical per-field
//! accessors. Here that collapses into one `get(InfoField)` dispatch over a
//! closed field set, with typed convenience accessors layered on top.
//! Absence is always an error, never a zero sentinel: a caller asking for a
//! timing or a size either gets a real value or `InfoUnavailable`.

use crate::error::TransferError;
use crate::handle::TransferHandle;
use crate::transport::Transport;

/// Identifier for one metadata field of a completed transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InfoField {
    /// Final URL after any redirects the transport followed.
    EffectiveUrl,
    StatusCode,
    /// Total transfer time, seconds.
    TotalTime,
    NameLookupTime,
    ConnectTime,
    PreTransferTime,
    StartTransferTime,
    /// Uploaded payload size, bytes.
    SizeUpload,
    SizeDownload,
    /// Average upload speed, bytes per second.
    SpeedUpload,
    SpeedDownload,
    RedirectCount,
    ContentType,
    LocalIp,
    LocalPort,
    PrimaryIp,
    PrimaryPort,
}

/// A metadata value. Each field has a natural kind: URLs, IPs, and content
/// types are `Text`; status, ports, and counts are `Integer`; timings,
/// sizes, and speeds are `Float`.
#[derive(Debug, Clone, PartialEq)]
pub enum InfoValue {
    Text(String),
    Integer(i64),
    Float(f64),
}

/// Lazy read-only view over a handle's post-transfer metadata.
///
/// Borrowed from `TransferHandle::info`; every accessor queries the
/// transport at call time, so the view always describes the most recently
/// completed transfer on that handle.
pub struct HandleInfo<'a, T: Transport> {
    handle: &'a TransferHandle<T>,
}

impl<'a, T: Transport> HandleInfo<'a, T> {
    pub(crate) fn new(handle: &'a TransferHandle<T>) -> Self {
        Self { handle }
    }

    /// Fetch one metadata field.
    ///
    /// Fails with `UseAfterDispose` on a disposed handle, and with
    /// `InfoUnavailable` before the first successful `perform` or when the
    /// transport cannot supply the field.
    pub fn get(&self, field: InfoField) -> Result<InfoValue, TransferError> {
        if self.handle.is_disposed() {
            return Err(TransferError::UseAfterDispose);
        }
        if !self.handle.has_completed() {
            return Err(TransferError::InfoUnavailable(field));
        }
        self.handle
            .transport()
            .query_info(field)
            .ok_or(TransferError::InfoUnavailable(field))
    }

    fn text(&self, field: InfoField) -> Result<String, TransferError> {
        match self.get(field)? {
            InfoValue::Text(s) => Ok(s),
            _ => Err(TransferError::InfoUnavailable(field)),
        }
    }

    fn integer(&self, field: InfoField) -> Result<i64, TransferError> {
        match self.get(field)? {
            InfoValue::Integer(n) => Ok(n),
            _ => Err(TransferError::InfoUnavailable(field)),
        }
    }

    fn float(&self, field: InfoField) -> Result<f64, TransferError> {
        match self.get(field)? {
            InfoValue::Float(x) => Ok(x),
            _ => Err(TransferError::InfoUnavailable(field)),
        }
    }

    pub fn effective_url(&self) -> Result<String, TransferError> {
        self.text(InfoField::EffectiveUrl)
    }

    pub fn status_code(&self) -> Result<u16, TransferError> {
        let n = self.integer(InfoField::StatusCode)?;
        u16::try_from(n).map_err(|_| TransferError::InfoUnavailable(InfoField::StatusCode))
    }

    pub fn total_time(&self) -> Result<f64, TransferError> {
        self.float(InfoField::TotalTime)
    }

    pub fn name_lookup_time(&self) -> Result<f64, TransferError> {
        self.float(InfoField::NameLookupTime)
    }

    pub fn connect_time(&self) -> Result<f64, TransferError> {
        self.float(InfoField::ConnectTime)
    }

    pub fn pre_transfer_time(&self) -> Result<f64, TransferError> {
        self.float(InfoField::PreTransferTime)
    }

    pub fn start_transfer_time(&self) -> Result<f64, TransferError> {
        self.float(InfoField::StartTransferTime)
    }

    pub fn size_upload(&self) -> Result<f64, TransferError> {
        self.float(InfoField::SizeUpload)
    }

    pub fn size_download(&self) -> Result<f64, TransferError> {
        self.float(InfoField::SizeDownload)
    }

    pub fn speed_upload(&self) -> Result<f64, TransferError> {
        self.float(InfoField::SpeedUpload)
    }

    pub fn speed_download(&self) -> Result<f64, TransferError> {
        self.float(InfoField::SpeedDownload)
    }

    pub fn redirect_count(&self) -> Result<i64, TransferError> {
        self.integer(InfoField::RedirectCount)
    }

    pub fn content_type(&self) -> Result<String, TransferError> {
        self.text(InfoField::ContentType)
    }

    pub fn local_ip(&self) -> Result<String, TransferError> {
        self.text(InfoField::LocalIp)
    }

    pub fn local_port(&self) -> Result<u16, TransferError> {
        let n = self.integer(InfoField::LocalPort)?;
        u16::try_from(n).map_err(|_| TransferError::InfoUnavailable(InfoField::LocalPort))
    }

    pub fn primary_ip(&self) -> Result<String, TransferError> {
        self.text(InfoField::PrimaryIp)
    }

    pub fn primary_port(&self) -> Result<u16, TransferError> {
        let n = self.integer(InfoField::PrimaryPort)?;
        u16::try_from(n).map_err(|_| TransferError::InfoUnavailable(InfoField::PrimaryPort))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ScriptedTransport;

    fn performed_handle(transport: ScriptedTransport) -> TransferHandle<ScriptedTransport> {
        let mut handle = TransferHandle::new(transport);
        handle.set_url("http://example.test/ok").unwrap();
        handle.perform().unwrap();
        handle
    }

    #[test]
    fn info_before_first_perform_is_unavailable() {
        let handle = TransferHandle::new(ScriptedTransport::with_status(200));
        let err = handle.info().status_code().unwrap_err();
        assert_eq!(err, TransferError::InfoUnavailable(InfoField::StatusCode));
    }

    #[test]
    fn status_code_reflects_completed_transfer() {
        let handle = performed_handle(ScriptedTransport::with_status(204));
        assert_eq!(handle.info().status_code().unwrap(), 204);
    }

    #[test]
    fn typed_accessors_read_scripted_metadata() {
        let transport = ScriptedTransport::with_status(200)
            .info(
                InfoField::EffectiveUrl,
                InfoValue::Text("http://example.test/final".to_string()),
            )
            .info(InfoField::TotalTime, InfoValue::Float(0.042))
            .info(InfoField::RedirectCount, InfoValue::Integer(1))
            .info(
                InfoField::ContentType,
                InfoValue::Text("text/plain".to_string()),
            )
            .info(InfoField::PrimaryPort, InfoValue::Integer(8080));
        let handle = performed_handle(transport);

        let info = handle.info();
        assert_eq!(info.effective_url().unwrap(), "http://example.test/final");
        assert_eq!(info.total_time().unwrap(), 0.042);
        assert_eq!(info.redirect_count().unwrap(), 1);
        assert_eq!(info.content_type().unwrap(), "text/plain");
        assert_eq!(info.primary_port().unwrap(), 8080);
    }

    #[test]
    fn absent_field_is_unavailable_not_zero() {
        let handle = performed_handle(ScriptedTransport::with_status(200));
        let err = handle.info().speed_download().unwrap_err();
        assert_eq!(err, TransferError::InfoUnavailable(InfoField::SpeedDownload));
    }

    #[test]
    fn kind_mismatch_is_unavailable() {
        let transport = ScriptedTransport::with_status(200).info(
            InfoField::TotalTime,
            InfoValue::Text("not a number".to_string()),
        );
        let handle = performed_handle(transport);
        let err = handle.info().total_time().unwrap_err();
        assert_eq!(err, TransferError::InfoUnavailable(InfoField::TotalTime));
    }

    #[test]
    fn info_after_dispose_is_use_after_dispose() {
        let mut handle = performed_handle(ScriptedTransport::with_status(200));
        handle.dispose();
        let err = handle.info().status_code().unwrap_err();
        assert_eq!(err, TransferError::UseAfterDispose);
    }
}
