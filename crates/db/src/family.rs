//! Finds the households a changed person belongs to.

use std::sync::Arc;

use evaka_finance_core::domain::family::FridgeFamily;
use evaka_finance_core::domain::person::PersonId;
use evaka_finance_core::family::generate_family_compositions;
use evaka_finance_core::period::Period;

use crate::repositories::{FamilyRepository, RepositoryError};

#[derive(Clone)]
pub struct FamilyResolver {
    repository: Arc<dyn FamilyRepository>,
}

impl FamilyResolver {
    pub fn new(repository: Arc<dyn FamilyRepository>) -> Self {
        Self { repository }
    }

    /// Households headed by `head_of_family` within `period`.
    pub async fn by_head_of_family(
        &self,
        head_of_family: PersonId,
        period: &Period,
    ) -> Result<Vec<FridgeFamily>, RepositoryError> {
        let partners = self.repository.partners_of(head_of_family).await?;
        let parentships = self.repository.parentships_by_head(head_of_family).await?;
        Ok(generate_family_compositions(head_of_family, &partners, &parentships, period))
    }

    /// Households of every head of family `adult` has a partnership with, over the
    /// whole of `period`. A partnership that no longer reaches into `period` still
    /// counts, so a shortened partnership regenerates the tail it was removed from.
    pub async fn by_partner(
        &self,
        adult: PersonId,
        period: &Period,
    ) -> Result<Vec<FridgeFamily>, RepositoryError> {
        let mut families = Vec::new();
        for partner in self.repository.partners_of(adult).await? {
            if partner.conflict {
                continue;
            }
            families.extend(self.by_head_of_family(partner.person, period).await?);
        }
        Ok(families)
    }

    /// Households `child` is a dependant in.
    pub async fn by_child(
        &self,
        child: PersonId,
        period: &Period,
    ) -> Result<Vec<FridgeFamily>, RepositoryError> {
        let mut families = Vec::new();
        for parentship in self.repository.parentships_by_child(child).await? {
            if parentship.conflict {
                continue;
            }
            let Some(shared) = parentship.period.intersection(period) else {
                continue;
            };
            families.extend(
                self.by_head_of_family(parentship.head_of_child, &shared)
                    .await?
                    .into_iter()
                    .filter(|family| family.children.iter().any(|member| member.id == child)),
            );
        }
        Ok(families)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;
    use uuid::Uuid;

    use evaka_finance_core::domain::family::{Parentship, Partnership};
    use evaka_finance_core::domain::person::{ChildRef, PersonId};
    use evaka_finance_core::period::Period;

    use super::FamilyResolver;
    use crate::fixtures::FinanceSnapshot;
    use crate::repositories::InMemoryFinanceSource;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn person() -> PersonId {
        PersonId(Uuid::new_v4())
    }

    struct Household {
        head: PersonId,
        partner: PersonId,
        child: ChildRef,
        source: Arc<InMemoryFinanceSource>,
        resolver: FamilyResolver,
    }

    fn household() -> Household {
        let head = person();
        let partner = person();
        let child = ChildRef { id: person(), date_of_birth: date(2020, 6, 1) };
        let snapshot = FinanceSnapshot {
            partnerships: vec![Partnership {
                id: Uuid::new_v4(),
                first: partner,
                second: head,
                period: Period::open(date(2024, 3, 1)),
                conflict: false,
            }],
            parentships: vec![Parentship {
                id: Uuid::new_v4(),
                head_of_child: head,
                child,
                period: Period::open(date(2020, 6, 1)),
                conflict: false,
            }],
            ..FinanceSnapshot::default()
        };
        let source = Arc::new(InMemoryFinanceSource::new(snapshot));
        let resolver = FamilyResolver::new(source.clone());
        Household { head, partner, child, source, resolver }
    }

    #[tokio::test]
    async fn head_of_family_timeline_splits_when_the_partner_moves_in() {
        let household = household();
        let families = household
            .resolver
            .by_head_of_family(household.head, &Period::open(date(2024, 1, 1)))
            .await
            .expect("families");

        // the third household starts when the child comes of age
        assert_eq!(families.len(), 3);
        assert_eq!(families[0].partner, None);
        assert_eq!(families[1].partner, Some(household.partner));
        assert_eq!(families[1].period.start(), date(2024, 3, 1));
        assert_eq!(families[1].period.end(), Some(date(2038, 5, 31)));
        assert!(families[2].children.is_empty());
    }

    #[tokio::test]
    async fn partner_resolves_to_the_households_of_the_head() {
        let household = household();
        let families = household
            .resolver
            .by_partner(household.partner, &Period::open(date(2024, 1, 1)))
            .await
            .expect("families");

        assert_eq!(families.len(), 3);
        assert!(families.iter().all(|family| family.head_of_family == household.head));
        assert_eq!(families[0].partner, None);
        assert_eq!(families[1].partner, Some(household.partner));
    }

    #[tokio::test]
    async fn ended_partnership_still_resolves_the_removed_tail() {
        let household = household();
        household
            .source
            .update(|snapshot| {
                snapshot.partnerships[0].period =
                    Period::closed(date(2024, 3, 1), date(2024, 6, 30)).expect("period");
            })
            .await;

        let families = household
            .resolver
            .by_partner(household.partner, &Period::open(date(2024, 7, 1)))
            .await
            .expect("families");

        assert!(!families.is_empty());
        assert!(families.iter().all(|family| family.head_of_family == household.head));
        assert_eq!(families[0].period.start(), date(2024, 7, 1));
        assert_eq!(families[0].partner, None);
    }

    #[tokio::test]
    async fn child_resolves_to_every_household_it_belongs_to() {
        let household = household();
        let families = household
            .resolver
            .by_child(household.child.id, &Period::open(date(2024, 1, 1)))
            .await
            .expect("families");

        assert_eq!(families.len(), 2);
        assert!(families.iter().all(|family| family.head_of_family == household.head));
    }

    #[tokio::test]
    async fn unrelated_person_has_no_households() {
        let household = household();
        let families = household
            .resolver
            .by_child(person(), &Period::open(date(2024, 1, 1)))
            .await
            .expect("families");
        assert!(families.is_empty());
    }
}
