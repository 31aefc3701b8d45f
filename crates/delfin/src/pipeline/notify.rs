use std::fmt;

use serde::Serialize;

use super::context::CaptureState;

pub const MSG_SAVED: &str = "Pedido guardado correctamente";
pub const MSG_PREVIOUS_REMOVED: &str = "Pedido anterior eliminado";
pub const MSG_DUPLICATE_REJECTED: &str = "Guardado cancelado - Pedido duplicado";
pub const MSG_SAVE_FAILED: &str = "Error al guardar el pedido";
pub const MSG_EXPORTED: &str = "Datos exportados correctamente";
pub const MSG_KEY_SAVED: &str = "Configuración guardada correctamente";
pub const MSG_DELETED: &str = "Pedido eliminado correctamente";
pub const MSG_CLEARED: &str = "Todos los datos han sido eliminados";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Success => "success",
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        };
        f.write_str(name)
    }
}

/// The single channel through which user-facing outcomes are reported.
pub trait Notifier: Send + Sync {
    fn notify(&self, severity: Severity, message: &str);

    fn state_changed(&self, _state: CaptureState) {}
}

/// Discards every notification.
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _severity: Severity, _message: &str) {}
}
