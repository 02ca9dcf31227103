use serde::{Deserialize, Serialize};

/// Amount in paise. Storage and arithmetic stay in minor units; rupee
/// floats exist only at the API edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Paise(pub i64);

impl Paise {
    pub fn from_rupees(rupees: f64) -> Self {
        Paise((rupees * 100.0).round() as i64)
    }

    pub fn as_rupees(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn as_paise(&self) -> i64 {
        self.0
    }
}

/// Renders paise as rupees with Indian digit grouping: the last three
/// integer digits form one group, every two after that form the next.
/// Whole-rupee amounts drop the paise part.
pub fn format_inr(amount: Paise) -> String {
    let sign = if amount.0 < 0 { "-" } else { "" };
    let abs = amount.0.unsigned_abs();
    let rupees = abs / 100;
    let paise = abs % 100;

    let grouped = group_indian(&rupees.to_string());
    if paise == 0 {
        format!("{}₹{}", sign, grouped)
    } else {
        format!("{}₹{}.{:02}", sign, grouped, paise)
    }
}

fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }

    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut parts: Vec<&str> = Vec::new();
    let mut end = head.len();
    while end > 2 {
        parts.push(&head[end - 2..end]);
        end -= 2;
    }
    parts.push(&head[..end]);
    parts.reverse();

    format!("{},{}", parts.join(","), tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_rupees_to_paise() {
        assert_eq!(Paise::from_rupees(1500.0), Paise(150000));
        assert_eq!(Paise::from_rupees(499.99), Paise(49999));
        assert_eq!(Paise::from_rupees(0.01), Paise(1));
    }

    #[test]
    fn converts_paise_back_to_rupees() {
        assert_eq!(Paise(150000).as_rupees(), 1500.0);
        assert_eq!(Paise(49999).as_rupees(), 499.99);
    }

    #[test]
    fn formats_small_amounts_without_grouping() {
        assert_eq!(format_inr(Paise(150000)), "₹1,500");
        assert_eq!(format_inr(Paise(50000)), "₹500");
        assert_eq!(format_inr(Paise(50)), "₹0.50");
    }

    #[test]
    fn groups_by_two_after_the_first_three() {
        assert_eq!(format_inr(Paise(24567000)), "₹2,45,670");
        assert_eq!(format_inr(Paise(1234567800)), "₹1,23,45,678");
        assert_eq!(format_inr(Paise(12345678900)), "₹12,34,56,789");
    }

    #[test]
    fn keeps_paise_when_fractional() {
        assert_eq!(format_inr(Paise(49999)), "₹499.99");
        assert_eq!(format_inr(Paise(150050)), "₹1,500.50");
    }

    #[test]
    fn formats_negative_amounts() {
        assert_eq!(format_inr(Paise(-150000)), "-₹1,500");
    }
}
