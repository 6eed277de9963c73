use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::fee_alteration::FeeAlterationWithEffect;
use crate::domain::income::DecisionIncome;
use crate::domain::person::{ChildRef, PersonId};
use crate::domain::placement::PermanentPlacement;
use crate::domain::pricing::Pricing;
use crate::errors::DomainError;
use crate::period::Period;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DecisionId(pub Uuid);

impl DecisionId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionStatus {
    Draft,
    WaitingForSending,
    WaitingForManualSending,
    Sent,
}

impl DecisionStatus {
    /// Statuses of decisions that have left the draft stage.
    pub const ACTIVE: [DecisionStatus; 3] =
        [Self::WaitingForSending, Self::WaitingForManualSending, Self::Sent];

    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Draft)
    }

    pub fn can_transition_to(&self, next: DecisionStatus) -> bool {
        matches!(
            (self, next),
            (Self::Draft, Self::WaitingForSending)
                | (Self::Draft, Self::WaitingForManualSending)
                | (Self::WaitingForSending, Self::WaitingForManualSending)
                | (Self::WaitingForSending, Self::Sent)
                | (Self::WaitingForManualSending, Self::Sent)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::WaitingForSending => "WAITING_FOR_SENDING",
            Self::WaitingForManualSending => "WAITING_FOR_MANUAL_SENDING",
            Self::Sent => "SENT",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "DRAFT" => Some(Self::Draft),
            "WAITING_FOR_SENDING" => Some(Self::WaitingForSending),
            "WAITING_FOR_MANUAL_SENDING" => Some(Self::WaitingForManualSending),
            "SENT" => Some(Self::Sent),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    Fee,
    VoucherValue,
}

impl DecisionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fee => "fee",
            Self::VoucherValue => "voucher_value",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeeDecisionType {
    #[default]
    Normal,
    ReliefAccepted,
    ReliefPartlyAccepted,
    ReliefRejected,
}

/// Household facts shared by every part of one decision.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecisionBasis {
    pub head_of_family: PersonId,
    pub partner: Option<PersonId>,
    pub head_of_family_income: Option<DecisionIncome>,
    pub partner_income: Option<DecisionIncome>,
    pub family_size: usize,
    pub pricing: Pricing,
}

/// One child's computed amounts before they are bound to a decision kind.
/// `base_amount` and `amount_before_alterations` are a fee or a co-payment
/// depending on the kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartCalculation {
    pub child: ChildRef,
    pub placement: PermanentPlacement,
    pub base_amount: i32,
    pub sibling_discount: i32,
    pub amount_before_alterations: i32,
    pub fee_alterations: Vec<FeeAlterationWithEffect>,
}

pub trait FinanceDecisionPart {
    fn child(&self) -> &ChildRef;
    fn placement(&self) -> &PermanentPlacement;
    fn sibling_discount(&self) -> i32;
    /// Amount after fee alterations, never negative.
    fn final_amount(&self) -> i32;
}

/// Capabilities the generation and reconciliation pipeline needs from a decision.
pub trait FinanceDecision: Clone + Send + Sync + 'static {
    type Part: FinanceDecisionPart + Clone + PartialEq;

    const KIND: DecisionKind;

    /// A fresh draft with a random id. Parts are ordered by sibling discount.
    fn draft(basis: DecisionBasis, parts: Vec<PartCalculation>, validity: Period) -> Self;

    fn id(&self) -> DecisionId;
    fn status(&self) -> DecisionStatus;
    fn head_of_family(&self) -> PersonId;
    fn parts(&self) -> &[Self::Part];
    fn validity(&self) -> Period;

    /// Equality of everything except id, status and validity.
    fn content_equals(&self, other: &Self) -> bool;

    fn with_validity(&self, validity: Period) -> Self;
    fn with_random_id(&self) -> Self;
    fn with_status(&self, status: DecisionStatus) -> Self;

    fn transition_to(&self, next: DecisionStatus) -> Result<Self, DomainError> {
        if self.status().can_transition_to(next) {
            return Ok(self.with_status(next));
        }
        Err(DomainError::InvalidDecisionTransition { from: self.status(), to: next })
    }
}

fn final_amount(before_alterations: i32, alterations: &[FeeAlterationWithEffect]) -> i32 {
    let total = alterations.iter().fold(before_alterations, |sum, alteration| {
        sum + alteration.effect
    });
    total.max(0)
}

fn sorted_by_sibling_discount<P, F>(parts: Vec<PartCalculation>, into_part: F) -> Vec<P>
where
    F: Fn(PartCalculation) -> P,
{
    let mut parts = parts;
    parts.sort_by_key(|part| part.sibling_discount);
    parts.into_iter().map(into_part).collect()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeDecisionPart {
    pub child: ChildRef,
    pub placement: PermanentPlacement,
    pub base_fee: i32,
    pub sibling_discount: i32,
    pub fee: i32,
    pub fee_alterations: Vec<FeeAlterationWithEffect>,
}

impl FinanceDecisionPart for FeeDecisionPart {
    fn child(&self) -> &ChildRef {
        &self.child
    }

    fn placement(&self) -> &PermanentPlacement {
        &self.placement
    }

    fn sibling_discount(&self) -> i32 {
        self.sibling_discount
    }

    fn final_amount(&self) -> i32 {
        final_amount(self.fee, &self.fee_alterations)
    }
}

impl From<PartCalculation> for FeeDecisionPart {
    fn from(part: PartCalculation) -> Self {
        Self {
            child: part.child,
            placement: part.placement,
            base_fee: part.base_amount,
            sibling_discount: part.sibling_discount,
            fee: part.amount_before_alterations,
            fee_alterations: part.fee_alterations,
        }
    }
}

/// Municipal daycare fee decision.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeDecision {
    pub id: DecisionId,
    pub status: DecisionStatus,
    pub decision_type: FeeDecisionType,
    pub head_of_family: PersonId,
    pub partner: Option<PersonId>,
    pub head_of_family_income: Option<DecisionIncome>,
    pub partner_income: Option<DecisionIncome>,
    pub family_size: usize,
    pub pricing: Pricing,
    pub parts: Vec<FeeDecisionPart>,
    pub validity: Period,
}

impl FeeDecision {
    pub fn total_fee(&self) -> i32 {
        self.parts.iter().map(FinanceDecisionPart::final_amount).sum()
    }
}

impl FinanceDecision for FeeDecision {
    type Part = FeeDecisionPart;

    const KIND: DecisionKind = DecisionKind::Fee;

    fn draft(basis: DecisionBasis, parts: Vec<PartCalculation>, validity: Period) -> Self {
        Self {
            id: DecisionId::random(),
            status: DecisionStatus::Draft,
            decision_type: FeeDecisionType::Normal,
            head_of_family: basis.head_of_family,
            partner: basis.partner,
            head_of_family_income: basis.head_of_family_income,
            partner_income: basis.partner_income,
            family_size: basis.family_size,
            pricing: basis.pricing,
            parts: sorted_by_sibling_discount(parts, FeeDecisionPart::from),
            validity,
        }
    }

    fn id(&self) -> DecisionId {
        self.id
    }

    fn status(&self) -> DecisionStatus {
        self.status
    }

    fn head_of_family(&self) -> PersonId {
        self.head_of_family
    }

    fn parts(&self) -> &[FeeDecisionPart] {
        &self.parts
    }

    fn validity(&self) -> Period {
        self.validity
    }

    fn content_equals(&self, other: &Self) -> bool {
        self.decision_type == other.decision_type
            && self.head_of_family == other.head_of_family
            && self.partner == other.partner
            && self.head_of_family_income == other.head_of_family_income
            && self.partner_income == other.partner_income
            && self.family_size == other.family_size
            && self.pricing == other.pricing
            && self.parts == other.parts
    }

    fn with_validity(&self, validity: Period) -> Self {
        Self { validity, ..self.clone() }
    }

    fn with_random_id(&self) -> Self {
        Self { id: DecisionId::random(), ..self.clone() }
    }

    fn with_status(&self, status: DecisionStatus) -> Self {
        Self { status, ..self.clone() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoucherValueDecisionPart {
    pub child: ChildRef,
    pub placement: PermanentPlacement,
    pub base_co_payment: i32,
    pub sibling_discount: i32,
    pub co_payment: i32,
    pub fee_alterations: Vec<FeeAlterationWithEffect>,
}

impl FinanceDecisionPart for VoucherValueDecisionPart {
    fn child(&self) -> &ChildRef {
        &self.child
    }

    fn placement(&self) -> &PermanentPlacement {
        &self.placement
    }

    fn sibling_discount(&self) -> i32 {
        self.sibling_discount
    }

    fn final_amount(&self) -> i32 {
        final_amount(self.co_payment, &self.fee_alterations)
    }
}

impl From<PartCalculation> for VoucherValueDecisionPart {
    fn from(part: PartCalculation) -> Self {
        Self {
            child: part.child,
            placement: part.placement,
            base_co_payment: part.base_amount,
            sibling_discount: part.sibling_discount,
            co_payment: part.amount_before_alterations,
            fee_alterations: part.fee_alterations,
        }
    }
}

/// Service voucher value decision: the family's co-payment at a voucher unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoucherValueDecision {
    pub id: DecisionId,
    pub status: DecisionStatus,
    pub head_of_family: PersonId,
    pub partner: Option<PersonId>,
    pub head_of_family_income: Option<DecisionIncome>,
    pub partner_income: Option<DecisionIncome>,
    pub family_size: usize,
    pub pricing: Pricing,
    pub parts: Vec<VoucherValueDecisionPart>,
    pub validity: Period,
}

impl VoucherValueDecision {
    pub fn total_co_payment(&self) -> i32 {
        self.parts.iter().map(FinanceDecisionPart::final_amount).sum()
    }
}

impl FinanceDecision for VoucherValueDecision {
    type Part = VoucherValueDecisionPart;

    const KIND: DecisionKind = DecisionKind::VoucherValue;

    fn draft(basis: DecisionBasis, parts: Vec<PartCalculation>, validity: Period) -> Self {
        Self {
            id: DecisionId::random(),
            status: DecisionStatus::Draft,
            head_of_family: basis.head_of_family,
            partner: basis.partner,
            head_of_family_income: basis.head_of_family_income,
            partner_income: basis.partner_income,
            family_size: basis.family_size,
            pricing: basis.pricing,
            parts: sorted_by_sibling_discount(parts, VoucherValueDecisionPart::from),
            validity,
        }
    }

    fn id(&self) -> DecisionId {
        self.id
    }

    fn status(&self) -> DecisionStatus {
        self.status
    }

    fn head_of_family(&self) -> PersonId {
        self.head_of_family
    }

    fn parts(&self) -> &[VoucherValueDecisionPart] {
        &self.parts
    }

    fn validity(&self) -> Period {
        self.validity
    }

    fn content_equals(&self, other: &Self) -> bool {
        self.head_of_family == other.head_of_family
            && self.partner == other.partner
            && self.head_of_family_income == other.head_of_family_income
            && self.partner_income == other.partner_income
            && self.family_size == other.family_size
            && self.pricing == other.pricing
            && self.parts == other.parts
    }

    fn with_validity(&self, validity: Period) -> Self {
        Self { validity, ..self.clone() }
    }

    fn with_random_id(&self) -> Self {
        Self { id: DecisionId::random(), ..self.clone() }
    }

    fn with_status(&self, status: DecisionStatus) -> Self {
        Self { status, ..self.clone() }
    }
}
