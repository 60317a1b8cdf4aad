//! Property tests over arbitrary delivery sequences for one referred account.

mod common;

use proptest::prelude::*;
use serde_json::Value;

use billing_reconciler::domain::account::UserAccount;
use billing_reconciler::domain::foundation::AccountId;
use billing_reconciler::domain::referral::{RefereeCategory, ReferralEvent, ReferralStatus};
use billing_reconciler::domain::subscription::{PlanTier, SubscriptionRecord, SubscriptionStatus};
use billing_reconciler::ports::BalanceCreditRequest;

use common::*;

#[derive(Debug, Clone)]
enum Delivery {
    Checkout,
    Updated(&'static str),
    Deleted,
    InvoiceFailed,
}

fn arb_delivery() -> impl Strategy<Value = Delivery> {
    prop_oneof![
        Just(Delivery::Checkout),
        prop::sample::select(vec!["trialing", "active", "past_due", "unpaid", "canceled"])
            .prop_map(Delivery::Updated),
        Just(Delivery::Deleted),
        Just(Delivery::InvoiceFailed),
    ]
}

fn arb_category() -> impl Strategy<Value = RefereeCategory> {
    prop_oneof![
        Just(RefereeCategory::Entrepreneur),
        Just(RefereeCategory::Customer),
    ]
}

struct World {
    harness: Harness,
    referrer: AccountId,
    referee: AccountId,
    referral: ReferralEvent,
}

#[derive(Debug)]
struct Snapshot {
    subscription: Option<SubscriptionRecord>,
    referee: Option<UserAccount>,
    referrer: Option<UserAccount>,
    referral: Option<ReferralEvent>,
    credits: Vec<BalanceCreditRequest>,
}

/// Snapshot fields that do not depend on generated ids.
type Projection = (
    Option<(SubscriptionStatus, PlanTier)>,
    Option<bool>,
    Option<u32>,
    Option<(ReferralStatus, bool, bool)>,
    Vec<(String, i64)>,
);

impl Snapshot {
    fn projection(&self) -> Projection {
        (
            self.subscription.as_ref().map(|s| (s.status, s.plan)),
            self.referee.as_ref().map(|a| a.entitled),
            self.referrer.as_ref().map(|a| a.accrued_reward_periods),
            self.referral
                .as_ref()
                .map(|r| (r.status, r.credited, r.referrer_reward_deferred)),
            self.credits
                .iter()
                .map(|c| (c.customer_id.clone(), c.amount))
                .collect(),
        )
    }
}

impl World {
    fn new(referrer_billed: bool, category: RefereeCategory) -> Self {
        let harness = Harness::new();
        let referrer = if referrer_billed {
            harness.billed_account("referrer@example.com", "cus_referrer")
        } else {
            harness.account("referrer@example.com")
        };
        let referee = harness.account("referee@example.com");
        let referral = ReferralEvent::pending(referrer, referee, category);
        harness.store.insert_referral(referral.clone());
        harness.gateway_subscription("sub_referee", "cus_referee", "trialing", MONTHLY_PRICE);
        Self {
            harness,
            referrer,
            referee,
            referral,
        }
    }

    fn body(&self, index: usize, delivery: &Delivery) -> Value {
        let event_id = format!("evt_{}", index);
        match delivery {
            Delivery::Checkout => {
                checkout_completed(&event_id, self.referee, "cus_referee", "sub_referee")
            }
            Delivery::Updated(status) => {
                subscription_updated(&event_id, "sub_referee", "cus_referee", status)
            }
            Delivery::Deleted => subscription_deleted(&event_id, "sub_referee", "cus_referee"),
            Delivery::InvoiceFailed => {
                invoice_payment_failed(&event_id, "sub_referee", "cus_referee")
            }
        }
    }

    fn snapshot(&self) -> Snapshot {
        let store = &self.harness.store;
        Snapshot {
            subscription: store.subscription(&self.referee),
            referee: store.account(&self.referee),
            referrer: store.account(&self.referrer),
            referral: store.referral(&self.referral.id),
            credits: self.harness.gateway.credits(),
        }
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    /// Property: delivering every event twice in a row ends in the same
    /// state as delivering each once.
    #[test]
    fn prop_replay_converges_on_single_delivery_state(
        deliveries in prop::collection::vec(arb_delivery(), 1..10),
        referrer_billed in any::<bool>(),
        category in arb_category(),
    ) {
        let rt = runtime();

        let once = World::new(referrer_billed, category);
        let twice = World::new(referrer_billed, category);

        rt.block_on(async {
            for (i, delivery) in deliveries.iter().enumerate() {
                once.harness.deliver(&once.body(i, delivery)).await;
            }
            for (i, delivery) in deliveries.iter().enumerate() {
                let body = twice.body(i, delivery);
                twice.harness.deliver(&body).await;
                twice.harness.deliver(&body).await;
            }
        });

        // Account ids differ between the two worlds; compare everything else.
        prop_assert_eq!(once.snapshot().projection(), twice.snapshot().projection());
    }

    /// Property: no party is ever credited more than its reward, and
    /// non-entrepreneur referrals never earn an external credit.
    #[test]
    fn prop_rewards_are_issued_at_most_once(
        deliveries in prop::collection::vec(arb_delivery(), 1..12),
        referrer_billed in any::<bool>(),
        category in arb_category(),
    ) {
        let rt = runtime();
        let world = World::new(referrer_billed, category);

        rt.block_on(async {
            for (i, delivery) in deliveries.iter().enumerate() {
                world.harness.deliver(&world.body(i, delivery)).await;
            }
        });

        let gateway = &world.harness.gateway;
        let referee_total = gateway.total_credited("cus_referee");
        let referrer_total = gateway.total_credited("cus_referrer");
        match category {
            RefereeCategory::Entrepreneur => {
                prop_assert!(referee_total <= 2 * PERIOD_VALUE);
                prop_assert!(referrer_total <= 3 * PERIOD_VALUE);
            }
            RefereeCategory::Customer => {
                prop_assert_eq!(referee_total, 0);
                prop_assert_eq!(referrer_total, 0);
            }
        }
        let referral = world.harness.store.referral(&world.referral.id).unwrap();
        if referral.credited {
            prop_assert_eq!(referee_total, 2 * PERIOD_VALUE);
        }
    }

    /// Property: after every subscription lifecycle event the entitlement
    /// flag matches the stored status.
    #[test]
    fn prop_entitlement_tracks_stored_status(
        deliveries in prop::collection::vec(arb_delivery(), 1..12),
    ) {
        let rt = runtime();
        let world = World::new(true, RefereeCategory::Entrepreneur);

        for (i, delivery) in deliveries.iter().enumerate() {
            rt.block_on(world.harness.deliver(&world.body(i, delivery)));
            if matches!(delivery, Delivery::InvoiceFailed) {
                continue;
            }
            let snapshot = world.snapshot();
            if let (Some(subscription), Some(account)) = (snapshot.subscription, snapshot.referee) {
                prop_assert_eq!(account.entitled, subscription.status.grants_entitlement());
            }
        }
    }
}
