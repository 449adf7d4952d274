//! Fixed-size maps keyed by tier, by region and tier, or by trade route and tier.
//!
//! The key spaces are small and closed, so values are stored in nested arrays indexed by the
//! position of each [`Region`] and [`Tier`]. Every map is therefore complete by construction.
use crate::region::{Region, Tier, parse_region, parse_tier};
use anyhow::{Context, Result, ensure};
use itertools::iproduct;
use serde::de::{Deserialize, Deserializer, Error as _};
use std::collections::HashMap;
use std::ops::{Index, IndexMut};
use strum::EnumCount;

/// Raw form of a per-tier table, as it appears in input files
pub type RawTierTable = HashMap<String, f64>;

/// Raw form of a per-region, per-tier table, as it appears in input files
pub type RawRegionTierTable = HashMap<String, RawTierTable>;

/// A value for each chip tier
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TierMap<T>([T; Tier::COUNT]);

impl<T> TierMap<T> {
    /// Build a map by evaluating `f` for every tier
    pub fn from_fn<F: FnMut(Tier) -> T>(f: F) -> Self {
        Self(Tier::ALL.map(f))
    }

    /// Iterate over tiers and values
    pub fn iter(&self) -> impl Iterator<Item = (Tier, &T)> {
        Tier::ALL.into_iter().zip(self.0.iter())
    }
}

impl<T: Copy> TierMap<T> {
    /// A map with the same value for every tier
    pub fn splat(value: T) -> Self {
        Self([value; Tier::COUNT])
    }
}

impl TierMap<f64> {
    /// Sum of values across tiers
    pub fn sum(&self) -> f64 {
        self.0.iter().sum()
    }
}

impl<T> Index<Tier> for TierMap<T> {
    type Output = T;

    fn index(&self, tier: Tier) -> &T {
        &self.0[tier.index()]
    }
}

impl<T> IndexMut<Tier> for TierMap<T> {
    fn index_mut(&mut self, tier: Tier) -> &mut T {
        &mut self.0[tier.index()]
    }
}

/// A value for each combination of region and chip tier
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RegionTierMap<T>([[T; Tier::COUNT]; Region::COUNT]);

impl<T> RegionTierMap<T> {
    /// Build a map by evaluating `f` for every region and tier
    pub fn from_fn<F: FnMut(Region, Tier) -> T>(mut f: F) -> Self {
        Self(Region::ALL.map(|region| Tier::ALL.map(|tier| f(region, tier))))
    }

    /// Iterate over all (region, tier) keys in index order
    pub fn keys() -> impl Iterator<Item = (Region, Tier)> {
        iproduct!(Region::ALL, Tier::ALL)
    }

    /// Iterate over keys and values
    pub fn iter(&self) -> impl Iterator<Item = ((Region, Tier), &T)> {
        Self::keys().map(move |key| (key, &self[key]))
    }

    /// The values for a single region
    pub fn region(&self, region: Region) -> TierMap<T>
    where
        T: Copy,
    {
        TierMap(self.0[region.index()])
    }
}

impl<T: Copy> RegionTierMap<T> {
    /// A map with the same value for every key
    pub fn splat(value: T) -> Self {
        Self([[value; Tier::COUNT]; Region::COUNT])
    }
}

impl RegionTierMap<f64> {
    /// Sum of values across regions, for each tier
    pub fn sum_over_regions(&self) -> TierMap<f64> {
        TierMap::from_fn(|tier| Region::ALL.iter().map(|&region| self[(region, tier)]).sum())
    }
}

impl<T> Index<(Region, Tier)> for RegionTierMap<T> {
    type Output = T;

    fn index(&self, (region, tier): (Region, Tier)) -> &T {
        &self.0[region.index()][tier.index()]
    }
}

impl<T> IndexMut<(Region, Tier)> for RegionTierMap<T> {
    fn index_mut(&mut self, (region, tier): (Region, Tier)) -> &mut T {
        &mut self.0[region.index()][tier.index()]
    }
}

/// A value for each trade route (origin, destination) and chip tier.
///
/// Domestic routes (origin equal to destination) are included.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TradeMap<T>([[[T; Tier::COUNT]; Region::COUNT]; Region::COUNT]);

impl<T> TradeMap<T> {
    /// Build a map by evaluating `f(origin, destination, tier)` for every route and tier
    pub fn from_fn<F: FnMut(Region, Region, Tier) -> T>(mut f: F) -> Self {
        Self(Region::ALL.map(|origin| {
            Region::ALL.map(|destination| Tier::ALL.map(|tier| f(origin, destination, tier)))
        }))
    }

    /// Iterate over all (origin, destination, tier) keys in index order
    pub fn keys() -> impl Iterator<Item = (Region, Region, Tier)> {
        iproduct!(Region::ALL, Region::ALL, Tier::ALL)
    }

    /// Iterate over keys and values
    pub fn iter(&self) -> impl Iterator<Item = ((Region, Region, Tier), &T)> {
        Self::keys().map(move |key| (key, &self[key]))
    }
}

impl<T: Copy> TradeMap<T> {
    /// A map with the same value for every key
    pub fn splat(value: T) -> Self {
        Self([[[value; Tier::COUNT]; Region::COUNT]; Region::COUNT])
    }
}

impl TradeMap<f64> {
    /// Total shipped from `origin` to all destinations (including itself) for `tier`
    pub fn total_from(&self, origin: Region, tier: Tier) -> f64 {
        Region::ALL
            .iter()
            .map(|&destination| self[(origin, destination, tier)])
            .sum()
    }

    /// Total received by `destination` from all origins (including itself) for `tier`
    pub fn total_to(&self, destination: Region, tier: Tier) -> f64 {
        Region::ALL
            .iter()
            .map(|&origin| self[(origin, destination, tier)])
            .sum()
    }
}

impl<T> Index<(Region, Region, Tier)> for TradeMap<T> {
    type Output = T;

    fn index(&self, (origin, destination, tier): (Region, Region, Tier)) -> &T {
        &self.0[origin.index()][destination.index()][tier.index()]
    }
}

impl<T> IndexMut<(Region, Region, Tier)> for TradeMap<T> {
    fn index_mut(&mut self, (origin, destination, tier): (Region, Region, Tier)) -> &mut T {
        &mut self.0[origin.index()][destination.index()][tier.index()]
    }
}

/// Convert a raw per-tier table into a [`TierMap`], requiring every tier to be present
pub fn tier_map_from_raw(raw: &RawTierTable) -> Result<TierMap<f64>> {
    let mut values = TierMap::<Option<f64>>::default();
    for (key, &value) in raw {
        let tier = parse_tier(key)?;
        values[tier] = Some(value);
    }

    for (tier, value) in values.iter() {
        ensure!(value.is_some(), "Missing value for chip tier {tier}");
    }

    Ok(TierMap::from_fn(|tier| values[tier].unwrap_or_default()))
}

/// Convert a raw per-region, per-tier table into a sparse map.
///
/// Keys which are absent from `raw` are `None`.
pub fn sparse_region_tier_map_from_raw(
    raw: &RawRegionTierTable,
) -> Result<RegionTierMap<Option<f64>>> {
    let mut values = RegionTierMap::default();
    for (region_key, tiers) in raw {
        let region = parse_region(region_key)?;
        for (tier_key, &value) in tiers {
            let tier = parse_tier(tier_key).with_context(|| format!("In region {region}"))?;
            values[(region, tier)] = Some(value);
        }
    }

    Ok(values)
}

/// Convert a raw per-region, per-tier table into a [`RegionTierMap`], requiring every key to be
/// present
pub fn region_tier_map_from_raw(raw: &RawRegionTierTable) -> Result<RegionTierMap<f64>> {
    let values = sparse_region_tier_map_from_raw(raw)?;
    for ((region, tier), value) in values.iter() {
        ensure!(
            value.is_some(),
            "Missing value for region {region}, chip tier {tier}"
        );
    }

    Ok(RegionTierMap::from_fn(|region, tier| {
        values[(region, tier)].unwrap_or_default()
    }))
}

/// Convert a raw destination -> origin -> tier table into a [`TradeMap`].
///
/// Routes which are absent from `raw` are given a value of zero.
pub fn trade_map_from_raw(raw: &HashMap<String, RawRegionTierTable>) -> Result<TradeMap<f64>> {
    let mut map = TradeMap::default();
    for (destination_key, origins) in raw {
        let destination = parse_region(destination_key)?;
        let by_origin = sparse_region_tier_map_from_raw(origins)
            .with_context(|| format!("In destination {destination}"))?;
        for ((origin, tier), value) in by_origin.iter() {
            if let Some(value) = value {
                map[(origin, destination, tier)] = *value;
            }
        }
    }

    Ok(map)
}

impl<'de> Deserialize<'de> for TierMap<f64> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawTierTable::deserialize(deserializer)?;
        tier_map_from_raw(&raw).map_err(|err| D::Error::custom(format!("{err:#}")))
    }
}

impl<'de> Deserialize<'de> for RegionTierMap<f64> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawRegionTierTable::deserialize(deserializer)?;
        region_tier_map_from_raw(&raw).map_err(|err| D::Error::custom(format!("{err:#}")))
    }
}

impl<'de> Deserialize<'de> for RegionTierMap<Option<f64>> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawRegionTierTable::deserialize(deserializer)?;
        sparse_region_tier_map_from_raw(&raw).map_err(|err| D::Error::custom(format!("{err:#}")))
    }
}

impl<'de> Deserialize<'de> for TradeMap<f64> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = HashMap::<String, RawRegionTierTable>::deserialize(deserializer)?;
        trade_map_from_raw(&raw).map_err(|err| D::Error::custom(format!("{err:#}")))
    }
}
