//! Domain models for a single dinner day: who cooks, what is being cooked,
//! and who eats (or takes food away).
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Reserved identifier prefix that distinguishes synthetic guest attendants
/// from member attendants.
pub const GUEST_ID_PREFIX: &str = "guest-";

/// Fixed ingredient vocabulary. Anything outside this set is rejected at the
/// boundary rather than stored as free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ingredient {
    Beef,
    Pork,
    Chicken,
    Fish,
    #[serde(rename = "Minced Meat")]
    MincedMeat,
    Rice,
    Potatoes,
    Pasta,
    Bread,
    Salad,
    Cheese,
}

impl Ingredient {
    pub const ALL: [Ingredient; 11] = [
        Ingredient::Beef,
        Ingredient::Pork,
        Ingredient::Chicken,
        Ingredient::Fish,
        Ingredient::MincedMeat,
        Ingredient::Rice,
        Ingredient::Potatoes,
        Ingredient::Pasta,
        Ingredient::Bread,
        Ingredient::Salad,
        Ingredient::Cheese,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Ingredient::Beef => "Beef",
            Ingredient::Pork => "Pork",
            Ingredient::Chicken => "Chicken",
            Ingredient::Fish => "Fish",
            Ingredient::MincedMeat => "Minced Meat",
            Ingredient::Rice => "Rice",
            Ingredient::Potatoes => "Potatoes",
            Ingredient::Pasta => "Pasta",
            Ingredient::Bread => "Bread",
            Ingredient::Salad => "Salad",
            Ingredient::Cheese => "Cheese",
        }
    }
}

impl fmt::Display for Ingredient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Ingredient {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ingredient::ALL
            .iter()
            .find(|i| i.name() == s)
            .copied()
            .ok_or_else(|| format!("Unknown ingredient: {}", s))
    }
}

/// One unit of meal consumption on a day: a member (with their portion count)
/// or a single guest (always one portion, billed to the guest fund).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendant {
    pub id: String,
    pub portions: f64,
    pub is_take_away: bool,
    #[serde(default)]
    pub is_automatically_set: bool,
}

impl Attendant {
    /// Attendance asserted directly by a member.
    pub fn member(id: &str, portions: f64, is_take_away: bool) -> Self {
        Self {
            id: id.to_string(),
            portions,
            is_take_away,
            is_automatically_set: false,
        }
    }

    /// Attendance written by the recurring projection job. These entries may
    /// later be retracted by the job; member-asserted ones may not.
    pub fn automatic(id: &str, portions: f64, is_take_away: bool) -> Self {
        Self {
            id: id.to_string(),
            portions,
            is_take_away,
            is_automatically_set: true,
        }
    }

    /// The n-th synthetic guest placeholder (1-based). Each guest is its own
    /// single-portion entry so guest cost falls out of the same
    /// divide-by-total-portions arithmetic as member entries.
    pub fn guest(n: usize) -> Self {
        Self {
            id: format!("{}{}", GUEST_ID_PREFIX, n),
            portions: 1.0,
            is_take_away: false,
            is_automatically_set: false,
        }
    }

    pub fn is_guest(&self) -> bool {
        self.id.starts_with(GUEST_ID_PREFIX)
    }
}

/// The per-date record aggregating cooks, ingredients, attendants and the
/// reconciled spend. Created implicitly on first interaction; an empty record
/// with no `used_budget` is the canonical cleared state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DinnerDay {
    pub date: NaiveDate,
    pub cooks: Vec<String>,
    pub ingredients: Vec<Ingredient>,
    pub attendants: Vec<Attendant>,
    pub used_budget: Option<f64>,
}

impl DinnerDay {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            cooks: Vec::new(),
            ingredients: Vec::new(),
            attendants: Vec::new(),
            used_budget: None,
        }
    }

    /// True when the record carries no information beyond its date.
    pub fn is_cleared(&self) -> bool {
        self.cooks.is_empty()
            && self.ingredients.is_empty()
            && self.attendants.is_empty()
            && self.used_budget.is_none()
    }

    /// Sum of portions over all attendants. Guest entries contribute their
    /// own `portions` field (fixed at 1 each).
    pub fn total_portions(&self) -> f64 {
        self.attendants.iter().map(|a| a.portions).sum()
    }

    pub fn guest_count(&self) -> usize {
        self.attendants.iter().filter(|a| a.is_guest()).count()
    }

    pub fn attendant(&self, id: &str) -> Option<&Attendant> {
        self.attendants.iter().find(|a| a.id == id)
    }

    pub fn has_cook(&self, id: &str) -> bool {
        self.cooks.iter().any(|c| c == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guest_attendants_are_single_portion() {
        let guest = Attendant::guest(3);
        assert_eq!(guest.id, "guest-3");
        assert_eq!(guest.portions, 1.0);
        assert!(guest.is_guest());
        assert!(!guest.is_take_away);
    }

    #[test]
    fn test_member_attendant_is_not_guest() {
        let member = Attendant::member("alice", 2.0, false);
        assert!(!member.is_guest());
        assert!(!member.is_automatically_set);

        let auto = Attendant::automatic("alice", 2.0, true);
        assert!(auto.is_automatically_set);
        assert!(auto.is_take_away);
    }

    #[test]
    fn test_total_portions_counts_guests_as_one_each() {
        let mut day = DinnerDay::empty(NaiveDate::from_ymd_opt(2024, 6, 10).unwrap());
        day.attendants.push(Attendant::member("a", 2.0, false));
        day.attendants.push(Attendant::member("b", 1.0, false));
        day.attendants.push(Attendant::guest(1));
        day.attendants.push(Attendant::guest(2));

        assert_eq!(day.total_portions(), 5.0);
        assert_eq!(day.guest_count(), 2);
    }

    #[test]
    fn test_empty_day_is_cleared() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        let day = DinnerDay::empty(date);
        assert!(day.is_cleared());

        let mut with_budget = DinnerDay::empty(date);
        with_budget.used_budget = Some(90.0);
        assert!(!with_budget.is_cleared());
    }

    #[test]
    fn test_ingredient_parse_round_trip() {
        for ingredient in Ingredient::ALL {
            let parsed: Ingredient = ingredient.name().parse().unwrap();
            assert_eq!(parsed, ingredient);
        }
        assert!("Tofu".parse::<Ingredient>().is_err());
    }

    #[test]
    fn test_attendant_serde_uses_original_field_names() {
        let attendant = Attendant::member("alice", 1.5, true);
        let json = serde_json::to_string(&attendant).unwrap();
        assert!(json.contains("isTakeAway"));
        assert!(json.contains("isAutomaticallySet"));

        // Entries written before the projection job existed lack the flag.
        let legacy: Attendant =
            serde_json::from_str(r#"{"id":"guest-1","portions":1.0,"isTakeAway":false}"#).unwrap();
        assert!(!legacy.is_automatically_set);
    }
}
