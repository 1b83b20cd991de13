//! OCPP 1.6 actions understood by the simulator

use std::fmt;

/// Actions this charge point sends or answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    // CP → CS
    BootNotification,
    Heartbeat,
    StatusNotification,
    StartTransaction,
    StopTransaction,
    MeterValues,
    // CS → CP
    RemoteStartTransaction,
    RemoteStopTransaction,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BootNotification => "BootNotification",
            Self::Heartbeat => "Heartbeat",
            Self::StatusNotification => "StatusNotification",
            Self::StartTransaction => "StartTransaction",
            Self::StopTransaction => "StopTransaction",
            Self::MeterValues => "MeterValues",
            Self::RemoteStartTransaction => "RemoteStartTransaction",
            Self::RemoteStopTransaction => "RemoteStopTransaction",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "BootNotification" => Some(Self::BootNotification),
            "Heartbeat" => Some(Self::Heartbeat),
            "StatusNotification" => Some(Self::StatusNotification),
            "StartTransaction" => Some(Self::StartTransaction),
            "StopTransaction" => Some(Self::StopTransaction),
            "MeterValues" => Some(Self::MeterValues),
            "RemoteStartTransaction" => Some(Self::RemoteStartTransaction),
            "RemoteStopTransaction" => Some(Self::RemoteStopTransaction),
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
