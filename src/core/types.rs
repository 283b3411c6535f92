use std::fmt;
use std::str::FromStr;

/// Lifecycle state of an order
///
/// Transitions are strictly forward: open -> confirmed -> completed.
/// Cancellation is modeled as deletion of an open order, not a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OrderStatus {
    #[default]
    Open,
    Confirmed,
    Completed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Open => "open",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Completed => "completed",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            OrderStatus::Open => "🛒",
            OrderStatus::Confirmed => "⏳",
            OrderStatus::Completed => "✅",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            OrderStatus::Open => "Open",
            OrderStatus::Confirmed => "Confirmed",
            OrderStatus::Completed => "Completed",
        }
    }

    /// Whether the status may advance directly to `to`.
    pub fn can_transition_to(&self, to: OrderStatus) -> bool {
        matches!(
            (self, to),
            (OrderStatus::Open, OrderStatus::Confirmed) | (OrderStatus::Confirmed, OrderStatus::Completed)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(OrderStatus::Open),
            "confirmed" => Ok(OrderStatus::Confirmed),
            "completed" => Ok(OrderStatus::Completed),
            _ => Err(format!("Unknown order status: {}", s)),
        }
    }
}

// rusqlite FromSql: read status from DB text column
impl rusqlite::types::FromSql for OrderStatus {
    fn column_result(value: rusqlite::types::ValueRef<'_>) -> rusqlite::types::FromSqlResult<Self> {
        let s = value.as_str()?;
        OrderStatus::from_str(s).map_err(|e| rusqlite::types::FromSqlError::Other(Box::new(std::io::Error::other(e))))
    }
}

// rusqlite ToSql: write status as text to DB
impl rusqlite::types::ToSql for OrderStatus {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        Ok(rusqlite::types::ToSqlOutput::Borrowed(rusqlite::types::ValueRef::Text(
            self.as_str().as_bytes(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_str() {
        assert_eq!(OrderStatus::from_str("open").unwrap(), OrderStatus::Open);
        assert_eq!(OrderStatus::from_str("confirmed").unwrap(), OrderStatus::Confirmed);
        assert_eq!(OrderStatus::from_str("completed").unwrap(), OrderStatus::Completed);
        assert!(OrderStatus::from_str("cancelled").is_err());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(OrderStatus::Open.to_string(), "open");
        assert_eq!(OrderStatus::Confirmed.to_string(), "confirmed");
        assert_eq!(OrderStatus::Completed.to_string(), "completed");
    }

    #[test]
    fn test_forward_transitions_only() {
        assert!(OrderStatus::Open.can_transition_to(OrderStatus::Confirmed));
        assert!(OrderStatus::Confirmed.can_transition_to(OrderStatus::Completed));

        assert!(!OrderStatus::Open.can_transition_to(OrderStatus::Completed));
        assert!(!OrderStatus::Confirmed.can_transition_to(OrderStatus::Open));
        assert!(!OrderStatus::Completed.can_transition_to(OrderStatus::Open));
        assert!(!OrderStatus::Completed.can_transition_to(OrderStatus::Confirmed));
        assert!(!OrderStatus::Open.can_transition_to(OrderStatus::Open));
    }
}
