//! Realistic values for columns whose name says what they hold.
//!
//! Names are matched on whole words, split on `_` and `-`, so `user_email` is an email
//! column while `emailed_at` is not. The first matching pattern wins.

use rand::{Rng, distr::Alphanumeric, seq::IndexedRandom as _};

use crate::values::ValueKind;

const FIRST_NAMES: &[&str] = &[
    "Ada", "Alan", "Grace", "Linus", "Margaret", "Dennis", "Barbara", "Ken", "Frances", "Edsger",
];
const LAST_NAMES: &[&str] = &[
    "Lovelace", "Turing", "Hopper", "Torvalds", "Hamilton", "Ritchie", "Liskov", "Thompson",
    "Allen", "Dijkstra",
];
const DOMAINS: &[&str] = &["example.com", "example.org", "example.net"];
const STREETS: &[&str] = &["Main St", "Oak Ave", "Maple Rd", "Cedar Ln", "Park Blvd"];
const CITIES: &[&str] = &["Springfield", "Riverside", "Fairview", "Georgetown", "Madison"];
const STATES: &[&str] = &["CA", "NY", "TX", "WA", "OR", "IL"];
const COUNTRIES: &[&str] = &["US", "CA", "GB", "DE", "FR", "JP"];
const COMPANIES: &[&str] = &["Acme", "Globex", "Initech", "Umbrella", "Hooli", "Vandelay"];
const JOB_TITLES: &[&str] = &["Engineer", "Manager", "Analyst", "Designer", "Director"];
const WORDS: &[&str] = &[
    "lorem", "ipsum", "dolor", "sit", "amet", "consectetur", "adipiscing", "elit", "sed", "do",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnPattern {
    Email,
    Username,
    FirstName,
    LastName,
    FullName,
    Phone,
    IpAddress,
    Url,
    Address,
    City,
    State,
    Country,
    PostalCode,
    Company,
    JobTitle,
    Description,
    Latitude,
    Longitude,
    Password,
}

impl ColumnPattern {
    /// Pattern matching the column `name`, if any.
    #[must_use]
    pub fn detect(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        let words = name.split(['_', '-']).filter(|x| !x.is_empty()).collect::<Vec<_>>();

        let any = |candidates: &[&str]| words.iter().any(|x| candidates.contains(x));
        let pair = |first: &str, second: &str| {
            words.windows(2).any(|x| x[0] == first && x[1] == second)
        };
        let exactly = |candidates: &[&str]| candidates.contains(&name.as_str());

        let pattern = if any(&["email"]) || pair("e", "mail") {
            Self::Email
        } else if any(&["username", "uname", "login"]) || pair("user", "name") {
            Self::Username
        } else if any(&["firstname", "fname", "givenname"])
            || pair("first", "name")
            || pair("given", "name")
        {
            Self::FirstName
        } else if any(&["lastname", "lname", "surname", "familyname"])
            || pair("last", "name")
            || pair("family", "name")
        {
            Self::LastName
        } else if exactly(&["name"])
            || any(&["fullname", "displayname"])
            || pair("full", "name")
            || pair("display", "name")
        {
            Self::FullName
        } else if any(&["phone", "mobile", "cell", "telephone", "tel"]) {
            Self::Phone
        } else if any(&["ip", "ipaddr", "ipaddress"]) {
            Self::IpAddress
        } else if exactly(&["url", "website", "link", "homepage"]) {
            Self::Url
        } else if any(&["address", "street", "streetaddress", "addressline"]) {
            Self::Address
        } else if exactly(&["city"]) {
            Self::City
        } else if exactly(&["state", "province", "region"]) {
            Self::State
        } else if exactly(&["country"]) {
            Self::Country
        } else if any(&["zip", "zipcode", "postal", "postcode"]) {
            Self::PostalCode
        } else if any(&["company", "organization", "org"]) {
            Self::Company
        } else if any(&["jobtitle", "title", "position", "role"]) {
            Self::JobTitle
        } else if any(&["description", "bio", "about", "summary"]) {
            Self::Description
        } else if exactly(&["lat", "latitude"]) {
            Self::Latitude
        } else if exactly(&["lng", "lon", "longitude"]) {
            Self::Longitude
        } else if any(&["password", "passwd", "pwd", "secret", "apikey", "token"])
            || pair("api", "key")
        {
            Self::Password
        } else {
            return None;
        };

        Some(pattern)
    }

    /// Whether values of this pattern fit a column of `kind`.
    #[must_use]
    pub const fn fits(self, kind: ValueKind) -> bool {
        match self {
            Self::Latitude | Self::Longitude => matches!(
                kind,
                ValueKind::Float | ValueKind::Decimal | ValueKind::Text { .. }
            ),
            _ => matches!(kind, ValueKind::Text { .. }),
        }
    }

    /// Random value for this pattern, cut to `max_len` characters.
    pub fn generate(self, rng: &mut impl Rng, max_len: Option<usize>) -> String {
        let value = match self {
            Self::Email => format!(
                "{}.{}@{}",
                pick(rng, FIRST_NAMES).to_ascii_lowercase(),
                pick(rng, LAST_NAMES).to_ascii_lowercase(),
                pick(rng, DOMAINS)
            ),
            Self::Username => format!(
                "{}{}",
                pick(rng, FIRST_NAMES).to_ascii_lowercase(),
                rng.random_range(1..1000)
            ),
            Self::FirstName => pick(rng, FIRST_NAMES).to_string(),
            Self::LastName => pick(rng, LAST_NAMES).to_string(),
            Self::FullName => format!("{} {}", pick(rng, FIRST_NAMES), pick(rng, LAST_NAMES)),
            Self::Phone => format!(
                "555-{:03}-{:04}",
                rng.random_range(0..1000),
                rng.random_range(0..10_000)
            ),
            Self::IpAddress => format!(
                "10.{}.{}.{}",
                rng.random_range(0..=255),
                rng.random_range(0..=255),
                rng.random_range(1..=254)
            ),
            Self::Url => format!(
                "https://{}/{}",
                pick(rng, DOMAINS),
                pick(rng, WORDS)
            ),
            Self::Address => format!("{} {}", rng.random_range(1..10_000), pick(rng, STREETS)),
            Self::City => pick(rng, CITIES).to_string(),
            Self::State => pick(rng, STATES).to_string(),
            Self::Country => pick(rng, COUNTRIES).to_string(),
            Self::PostalCode => format!("{:05}", rng.random_range(0..100_000)),
            Self::Company => pick(rng, COMPANIES).to_string(),
            Self::JobTitle => pick(rng, JOB_TITLES).to_string(),
            Self::Description => (0..rng.random_range(3..8))
                .map(|_| pick(rng, WORDS))
                .collect::<Vec<_>>()
                .join(" "),
            Self::Latitude => format!("{:.6}", rng.random_range(-90.0..=90.0)),
            Self::Longitude => format!("{:.6}", rng.random_range(-180.0..=180.0)),
            Self::Password => (0..16)
                .map(|_| char::from(rng.sample(Alphanumeric)))
                .collect(),
        };

        match max_len {
            Some(max) => value.chars().take(max).collect(),
            None => value,
        }
    }
}

fn pick<'a>(rng: &mut impl Rng, words: &[&'a str]) -> &'a str {
    words.choose(rng).copied().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rand::{SeedableRng as _, rngs::StdRng};

    use super::*;

    #[test_log::test]
    fn names_match_on_whole_words() {
        assert_eq!(ColumnPattern::detect("email"), Some(ColumnPattern::Email));
        assert_eq!(ColumnPattern::detect("user_email"), Some(ColumnPattern::Email));
        assert_eq!(ColumnPattern::detect("emailed_at"), None);
        assert_eq!(ColumnPattern::detect("user_name"), Some(ColumnPattern::Username));
        assert_eq!(ColumnPattern::detect("first_name"), Some(ColumnPattern::FirstName));
        assert_eq!(ColumnPattern::detect("Surname"), Some(ColumnPattern::LastName));
        assert_eq!(ColumnPattern::detect("name"), Some(ColumnPattern::FullName));
        assert_eq!(ColumnPattern::detect("ip_address"), Some(ColumnPattern::IpAddress));
        assert_eq!(ColumnPattern::detect("home_address"), Some(ColumnPattern::Address));
        assert_eq!(ColumnPattern::detect("city"), Some(ColumnPattern::City));
        assert_eq!(ColumnPattern::detect("city_id"), None);
        assert_eq!(ColumnPattern::detect("api_key"), Some(ColumnPattern::Password));
        assert_eq!(ColumnPattern::detect("varchar_col"), None);
    }

    #[test_log::test]
    fn generated_values_respect_max_len() {
        let mut rng = StdRng::seed_from_u64(4);

        for _ in 0..50 {
            let value = ColumnPattern::Email.generate(&mut rng, Some(8));
            assert!(value.chars().count() <= 8, "{value}");
        }
    }

    #[test_log::test]
    fn emails_look_like_emails() {
        let mut rng = StdRng::seed_from_u64(6);

        let value = ColumnPattern::Email.generate(&mut rng, None);

        assert!(value.contains('@'), "{value}");
    }

    #[test_log::test]
    fn coordinates_fit_numeric_columns() {
        assert!(ColumnPattern::Latitude.fits(ValueKind::Float));
        assert!(!ColumnPattern::Email.fits(ValueKind::Integer));

        let value = ColumnPattern::Latitude.generate(&mut StdRng::seed_from_u64(1), None);
        let value = value.parse::<f64>().unwrap();
        assert!((-90.0..=90.0).contains(&value));
    }
}
