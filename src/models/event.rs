use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use super::{text_backed, ParseEnumError};

/// The six fixed event domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventCategory {
    #[serde(rename = "SOFTWARE DOMAIN EVENTS")]
    Software,
    #[serde(rename = "HARDWARE DOMAIN EVENTS")]
    Hardware,
    #[serde(rename = "ROBOTICS DOMAIN EVENTS")]
    Robotics,
    #[serde(rename = "IoT DOMAIN EVENTS")]
    Iot,
    #[serde(rename = "AI/ML DOMAIN EVENTS")]
    AiMl,
    #[serde(rename = "CYBERSECURITY DOMAIN EVENTS")]
    Cybersecurity,
}

impl EventCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::Software => "SOFTWARE DOMAIN EVENTS",
            EventCategory::Hardware => "HARDWARE DOMAIN EVENTS",
            EventCategory::Robotics => "ROBOTICS DOMAIN EVENTS",
            EventCategory::Iot => "IoT DOMAIN EVENTS",
            EventCategory::AiMl => "AI/ML DOMAIN EVENTS",
            EventCategory::Cybersecurity => "CYBERSECURITY DOMAIN EVENTS",
        }
    }
}

impl std::str::FromStr for EventCategory {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SOFTWARE DOMAIN EVENTS" => Ok(EventCategory::Software),
            "HARDWARE DOMAIN EVENTS" => Ok(EventCategory::Hardware),
            "ROBOTICS DOMAIN EVENTS" => Ok(EventCategory::Robotics),
            "IoT DOMAIN EVENTS" => Ok(EventCategory::Iot),
            "AI/ML DOMAIN EVENTS" => Ok(EventCategory::AiMl),
            "CYBERSECURITY DOMAIN EVENTS" => Ok(EventCategory::Cybersecurity),
            other => Err(ParseEnumError(other.to_string())),
        }
    }
}

text_backed!(EventCategory);

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub event_date: NaiveDate,
    pub event_time: NaiveTime,
    pub description: String,
    pub image_path: String,
    pub category: EventCategory,
    pub rule_book_path: Option<String>,
    pub price: Decimal,
    pub registration_fields: Json<Vec<String>>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated input for creating or replacing an event.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: String,
    pub event_date: NaiveDate,
    pub event_time: NaiveTime,
    pub description: String,
    pub image_path: String,
    pub category: EventCategory,
    pub rule_book_path: Option<String>,
    pub price: Decimal,
    pub registration_fields: Vec<String>,
    pub created_by: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_round_trips_through_str() {
        for s in [
            "SOFTWARE DOMAIN EVENTS",
            "HARDWARE DOMAIN EVENTS",
            "ROBOTICS DOMAIN EVENTS",
            "IoT DOMAIN EVENTS",
            "AI/ML DOMAIN EVENTS",
            "CYBERSECURITY DOMAIN EVENTS",
        ] {
            let cat: EventCategory = s.parse().unwrap();
            assert_eq!(cat.as_str(), s);
        }
    }

    #[test]
    fn unknown_category_is_rejected() {
        assert!("GAMING DOMAIN EVENTS".parse::<EventCategory>().is_err());
    }
}
