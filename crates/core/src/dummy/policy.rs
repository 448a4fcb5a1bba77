use crate::domain::customer::CustomerId;

/// How a caller-supplied customer id is mapped before matching the fixture.
///
/// The fixture numbers its customers 101..=110, and users tend to type the
/// short form ("customer 4"). `OffsetBelow` restores that form; it is off
/// unless configured.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CustomerIdPolicy {
    #[default]
    Exact,
    OffsetBelow { threshold: i64, offset: i64 },
}

impl CustomerIdPolicy {
    pub fn fixture_offset() -> Self {
        Self::OffsetBelow { threshold: 100, offset: 100 }
    }

    pub fn from_flag(normalize: bool) -> Self {
        if normalize {
            Self::fixture_offset()
        } else {
            Self::Exact
        }
    }

    pub fn normalize(&self, customer_id: CustomerId) -> CustomerId {
        match *self {
            Self::Exact => customer_id,
            Self::OffsetBelow { threshold, offset } if customer_id.0 < threshold => {
                CustomerId(customer_id.0.saturating_add(offset))
            }
            Self::OffsetBelow { .. } => customer_id,
        }
    }
}
