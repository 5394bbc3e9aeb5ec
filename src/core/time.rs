use time::{
    format_description::well_known::Rfc3339, macros::format_description, Date, OffsetDateTime,
    PrimitiveDateTime,
};

pub(crate) fn primitive_now_utc() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_utc();
    PrimitiveDateTime::new(now.date(), now.time())
}

pub(crate) fn today_utc() -> Date {
    OffsetDateTime::now_utc().date()
}

pub(crate) fn format_primitive(value: PrimitiveDateTime) -> String {
    value.assume_utc().format(&Rfc3339).unwrap_or_else(|_| value.assume_utc().to_string())
}

pub(crate) fn format_date(value: Date) -> String {
    value.format(format_description!("[year]-[month]-[day]")).unwrap_or_else(|_| value.to_string())
}

/// `YYYY-MM-DD` serde adapter for survey windows.
pub(crate) mod iso_date {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::{macros::format_description, Date};

    pub(crate) fn serialize<S: Serializer>(value: &Date, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_date(*value))
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Date, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Date::parse(raw.trim(), format_description!("[year]-[month]-[day]"))
            .map_err(|_| serde::de::Error::custom(format!("invalid date '{raw}', expected YYYY-MM-DD")))
    }

    pub(crate) mod option {
        use serde::{Deserialize, Deserializer, Serializer};
        use time::Date;

        pub(crate) fn serialize<S: Serializer>(
            value: &Option<Date>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(date) => serializer.serialize_some(&super::super::format_date(*date)),
                None => serializer.serialize_none(),
            }
        }

        pub(crate) fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Date>, D::Error> {
            #[derive(Deserialize)]
            struct Wrapper(#[serde(with = "crate::core::time::iso_date")] Date);

            Ok(Option::<Wrapper>::deserialize(deserializer)?.map(|Wrapper(date)| date))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use time::{Date, Month, Time};

    #[derive(Deserialize)]
    struct Window {
        #[serde(with = "iso_date")]
        start: Date,
        #[serde(default, deserialize_with = "iso_date::option::deserialize")]
        end: Option<Date>,
    }

    #[test]
    fn format_primitive_outputs_utc_z() {
        let date = Date::from_calendar_date(2025, Month::January, 2).unwrap();
        let time = Time::from_hms(10, 20, 30).unwrap();
        let value = PrimitiveDateTime::new(date, time);
        assert_eq!(format_primitive(value), "2025-01-02T10:20:30Z");
    }

    #[test]
    fn iso_date_parses_plain_dates() {
        let window: Window = serde_json::from_str(r#"{"start":"2025-03-01"}"#).unwrap();
        assert_eq!(window.start, Date::from_calendar_date(2025, Month::March, 1).unwrap());
        assert!(window.end.is_none());

        let window: Window =
            serde_json::from_str(r#"{"start":"2025-03-01","end":"2025-03-31"}"#).unwrap();
        assert_eq!(format_date(window.end.unwrap()), "2025-03-31");
    }

    #[test]
    fn iso_date_rejects_timestamps() {
        let result = serde_json::from_str::<Window>(r#"{"start":"2025-03-01T10:00:00Z"}"#);
        assert!(result.is_err());
    }
}
