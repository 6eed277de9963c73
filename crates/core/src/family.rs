use crate::domain::family::{FridgeFamily, Parentship, Partner};
use crate::domain::person::{ChildRef, PersonId};
use crate::period::{distinct_periods, merge_equal_periods, Period};

/// The days a child counts as a dependant: birth up to the day before turning 18.
pub fn dependant_period(child: &ChildRef) -> Option<Period> {
    let last_day = child.adulthood_date().pred_opt()?;
    Period::closed(child.date_of_birth, last_day).ok()
}

/// Slices `whole_period` into household compositions of `head_of_family`.
///
/// Conflicting relations are ignored. Every slice gets the partner whose
/// partnership covers it and the children whose parentship covers it and who are
/// still minors when it starts. Adjacent slices with the same composition are
/// merged into one family.
pub fn generate_family_compositions(
    head_of_family: PersonId,
    partners: &[Partner],
    parentships: &[Parentship],
    whole_period: &Period,
) -> Vec<FridgeFamily> {
    let partners: Vec<&Partner> = partners.iter().filter(|partner| !partner.conflict).collect();
    let parentships: Vec<&Parentship> = parentships
        .iter()
        .filter(|parentship| !parentship.conflict && parentship.head_of_child == head_of_family)
        .collect();

    let boundaries: Vec<Period> = partners
        .iter()
        .map(|partner| partner.period)
        .chain(parentships.iter().map(|parentship| parentship.period))
        .chain(parentships.iter().filter_map(|parentship| dependant_period(&parentship.child)))
        .collect();

    let slices = distinct_periods(&boundaries, whole_period)
        .into_iter()
        .map(|period| {
            let partner = partners
                .iter()
                .find(|partner| partner.period.contains(&period))
                .map(|partner| partner.person);
            let children: Vec<ChildRef> = parentships
                .iter()
                .filter(|parentship| parentship.period.contains(&period))
                .filter(|parentship| period.start() < parentship.child.adulthood_date())
                .map(|parentship| parentship.child)
                .collect();
            (period, (partner, children))
        })
        .collect();

    merge_equal_periods(slices)
        .into_iter()
        .map(|(period, (partner, children))| FridgeFamily {
            head_of_family,
            partner,
            children,
            period,
        })
        .collect()
}
