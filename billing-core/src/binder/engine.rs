//! Binder Engine

use super::{BindingEvent, RebindPlan};
use crate::config::BillingConfig;
use crate::error::{BillingError, BillingResult};
use crate::ports::{KeeperView, Keepers};
use crate::types::*;
use std::collections::{BTreeMap, BTreeSet};

/// Virtual-group binder
#[derive(Clone, Debug)]
pub struct VirtualGroupBinder {
    /// Maximum local bindings per bucket
    max_bindings: u32,
    /// Minimum billed size of one payload
    min_charge_size: u64,
}

impl VirtualGroupBinder {
    pub fn new(config: &BillingConfig) -> Self {
        Self {
            max_bindings: config.max_local_bindings_per_bucket,
            min_charge_size: config.min_charge_size,
        }
    }

    fn charge_size(&self, payload_size: u64) -> u64 {
        payload_size.max(self.min_charge_size)
    }

    /// Route a new payload of `bucket` to a GVG.
    ///
    /// Target GVG: `target` when given, else the GVG of the bucket's first
    /// binding, else the family's first GVG.
    pub fn bind_new_payload(
        &self,
        keepers: &mut Keepers<'_>,
        bucket: &Bucket,
        target: Option<GvgId>,
        payload_size: u64,
    ) -> BillingResult<BindingEvent> {
        bucket.ensure_status(BucketStatus::Created)?;

        let family = keepers
            .groups
            .family(bucket.primary_sp_id, bucket.family_id)
            .ok_or(BillingError::FamilyNotFound {
                sp_id: bucket.primary_sp_id.get(),
                family_id: bucket.family_id.get(),
            })?;

        let bindings = keepers.store.local_bindings(bucket.id);
        let gvg_id = match target {
            Some(gvg_id) => gvg_id,
            None => bindings
                .first()
                .map(|b| b.gvg_id)
                .or_else(|| family.first_gvg())
                .ok_or(BillingError::EmptyFamily {
                    family_id: family.id.get(),
                })?,
        };
        if !family.contains(gvg_id) {
            return Err(BillingError::GvgNotInFamily {
                gvg_id: gvg_id.get(),
                family_id: family.id.get(),
            });
        }

        let existing = bindings.iter().find(|b| b.gvg_id == gvg_id).cloned();
        if existing.is_none() && bindings.len() >= self.max_bindings as usize {
            return Err(BillingError::BindingLimitExceeded {
                bucket_id: bucket.id.get(),
                max: self.max_bindings,
            });
        }

        let mut gvg = keepers.groups.reserve_capacity(gvg_id, payload_size)?;
        let charge_size = self.charge_size(payload_size);

        let created = existing.is_none();
        let mut binding = match existing {
            Some(binding) => binding,
            None => LocalBinding::new(keepers.store.next_binding_id(bucket.id), bucket.id, gvg_id),
        };
        binding.stored_size = add_size(binding.stored_size, payload_size)?;
        binding.total_charge_size = add_size(binding.total_charge_size, charge_size)?;
        gvg.stored_size = add_size(gvg.stored_size, payload_size)?;

        keepers.groups.save_gvg(gvg);
        keepers.store.save_local_binding(binding.clone());

        tracing::info!(
            "Bound {} bytes of bucket {} to gvg {} via binding {}",
            payload_size,
            bucket.name,
            gvg_id,
            binding.id
        );

        Ok(if created {
            BindingEvent::Created(binding)
        } else {
            BindingEvent::Updated(binding)
        })
    }

    /// Release a payload from a binding. Empty bindings are kept.
    pub fn unbind_payload(
        &self,
        keepers: &mut Keepers<'_>,
        bucket: &Bucket,
        binding_id: BindingId,
        payload_size: u64,
    ) -> BillingResult<LocalBinding> {
        let mut binding = keepers
            .store
            .local_binding(bucket.id, binding_id)
            .ok_or(BillingError::BindingNotFound {
                bucket_id: bucket.id.get(),
                binding_id: binding_id.get(),
            })?;
        let mut gvg = keepers
            .groups
            .gvg(binding.gvg_id)
            .ok_or(BillingError::GvgNotFound {
                gvg_id: binding.gvg_id.get(),
            })?;
        let charge_size = self.charge_size(payload_size);

        let target = format!("binding {} of bucket {}", binding_id, bucket.name);
        binding.stored_size = sub_size(&target, binding.stored_size, payload_size)?;
        binding.total_charge_size = sub_size(&target, binding.total_charge_size, charge_size)?;
        gvg.stored_size = sub_size(&format!("gvg {}", gvg.id), gvg.stored_size, payload_size)?;

        keepers.groups.save_gvg(gvg);
        keepers.store.save_local_binding(binding.clone());

        tracing::info!(
            "Unbound {} bytes of bucket {} from binding {}",
            payload_size,
            bucket.name,
            binding_id
        );
        Ok(binding)
    }

    /// Validate a rebind of every binding of `bucket` into `dst_family`.
    ///
    /// Nothing is written.
    pub fn plan_rebind(
        &self,
        view: KeeperView<'_>,
        bucket: &Bucket,
        dst_family: &GvgFamily,
        mapping: &BTreeMap<GvgId, GvgId>,
    ) -> BillingResult<RebindPlan> {
        let bindings = view.store.local_bindings(bucket.id);

        let bound: BTreeSet<GvgId> = bindings.iter().map(|b| b.gvg_id).collect();
        let keys: BTreeSet<GvgId> = mapping.keys().copied().collect();
        if bound != keys {
            return Err(BillingError::IncompleteRebindMapping {
                bucket_id: bucket.id.get(),
                missing: bound.difference(&keys).map(|g| g.get()).collect(),
                unexpected: keys.difference(&bound).map(|g| g.get()).collect(),
            });
        }

        let mut targets = BTreeSet::new();
        for dst in mapping.values() {
            if !targets.insert(*dst) {
                return Err(BillingError::DuplicateRebindTarget {
                    bucket_id: bucket.id.get(),
                    gvg_id: dst.get(),
                });
            }
            if !dst_family.contains(*dst) {
                return Err(BillingError::GvgNotInFamily {
                    gvg_id: dst.get(),
                    family_id: dst_family.id.get(),
                });
            }
        }

        let mut gvg_deltas: BTreeMap<GvgId, i128> = BTreeMap::new();
        let mut rebound = Vec::with_capacity(bindings.len());
        for binding in bindings {
            let dst = mapping[&binding.gvg_id];
            *gvg_deltas.entry(binding.gvg_id).or_insert(0) -= binding.stored_size as i128;
            *gvg_deltas.entry(dst).or_insert(0) += binding.stored_size as i128;
            rebound.push(LocalBinding {
                gvg_id: dst,
                ..binding
            });
        }
        gvg_deltas.retain(|_, delta| *delta != 0);

        for (gvg_id, delta) in &gvg_deltas {
            if *delta > 0 {
                let extra = u64::try_from(*delta).map_err(|_| {
                    BillingError::invariant("size_overflow", format!("gvg {} delta {}", gvg_id, delta))
                })?;
                view.groups.reserve_capacity(*gvg_id, extra)?;
            } else {
                let gvg = view
                    .groups
                    .gvg(*gvg_id)
                    .ok_or(BillingError::GvgNotFound { gvg_id: gvg_id.get() })?;
                let released = delta.unsigned_abs();
                if released > gvg.stored_size as u128 {
                    return Err(BillingError::SizeUnderflow {
                        target: format!("gvg {}", gvg_id),
                        requested: released as u64,
                        available: gvg.stored_size,
                    });
                }
            }
        }
        // identity entries leave no delta but must still name a real GVG
        for dst in mapping.values() {
            if view.groups.gvg(*dst).is_none() {
                return Err(BillingError::GvgNotFound { gvg_id: dst.get() });
            }
        }

        Ok(RebindPlan {
            bucket_id: bucket.id,
            bindings: rebound,
            gvg_deltas,
        })
    }

    /// Apply a validated plan
    pub fn apply_rebind(&self, keepers: &mut Keepers<'_>, plan: RebindPlan) -> BillingResult<()> {
        for (gvg_id, delta) in &plan.gvg_deltas {
            let mut gvg = keepers
                .groups
                .gvg(*gvg_id)
                .ok_or(BillingError::GvgNotFound { gvg_id: gvg_id.get() })?;
            gvg.stored_size = u64::try_from(gvg.stored_size as i128 + delta).map_err(|_| {
                BillingError::invariant("size_overflow", format!("gvg {} delta {}", gvg_id, delta))
            })?;
            keepers.groups.save_gvg(gvg);
        }
        for binding in &plan.bindings {
            keepers.store.save_local_binding(binding.clone());
        }

        tracing::info!(
            "Rebound {} bindings of bucket {}",
            plan.bindings.len(),
            plan.bucket_id
        );
        Ok(())
    }

    /// Move every binding of `bucket` according to `mapping`, all or nothing
    pub fn rebind_all(
        &self,
        keepers: &mut Keepers<'_>,
        bucket: &Bucket,
        dst_family: &GvgFamily,
        mapping: &BTreeMap<GvgId, GvgId>,
    ) -> BillingResult<Vec<LocalBinding>> {
        let plan = self.plan_rebind(keepers.view(), bucket, dst_family, mapping)?;
        let bindings = plan.bindings.clone();
        self.apply_rebind(keepers, plan)?;
        Ok(bindings)
    }
}

fn add_size(current: u64, extra: u64) -> BillingResult<u64> {
    current.checked_add(extra).ok_or_else(|| {
        BillingError::invariant("size_overflow", format!("{} + {} overflows", current, extra))
    })
}

fn sub_size(target: &str, current: u64, released: u64) -> BillingResult<u64> {
    current.checked_sub(released).ok_or_else(|| BillingError::SizeUnderflow {
        target: target.to_string(),
        requested: released,
        available: current,
    })
}
