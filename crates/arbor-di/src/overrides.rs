//! Resolver overrides
//!
//! Overrides are supplied with a resolve call and substitute the value of matching
//! dependency sites anywhere in the resulting object graph. Each override ranks how
//! well it matches a site; selection prefers the strongest match and, among equal
//! matches, the override supplied last.

use crate::contract::{Contract, TypeKey};
use crate::injection::InjectionValue;
use crate::recipe::{ImportSite, MemberKind};
use std::fmt;
use std::sync::Arc;

/// How well an override applies to a dependency site.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchRank {
	NoMatch,
	PartialMatch,
	ExactMatch,
}

/// The site an override is matched against.
#[derive(Clone, Copy, Debug)]
pub struct DependencySite<'a> {
	pub site: &'a ImportSite,
	/// Contract the site resolves when not overridden.
	pub contract: &'a Contract,
}

pub trait ResolverOverride: Send + Sync + fmt::Debug {
	fn match_site(&self, site: &DependencySite<'_>) -> MatchRank;

	/// Minimum rank at which this override may be selected.
	fn required_rank(&self) -> MatchRank {
		MatchRank::PartialMatch
	}

	fn value(&self) -> &InjectionValue;
}

/// Picks the override to apply at `site`.
///
/// Scans from the last override to the first. An exact match is returned at once;
/// otherwise the first strictly stronger candidate seen is kept and returned only if
/// it meets its own required rank.
pub fn select_override<'o>(
	overrides: &'o [Arc<dyn ResolverOverride>],
	site: &DependencySite<'_>,
) -> Option<&'o Arc<dyn ResolverOverride>> {
	let mut candidate: Option<&'o Arc<dyn ResolverOverride>> = None;
	let mut candidate_rank = MatchRank::NoMatch;

	for entry in overrides.iter().rev() {
		let rank = entry.match_site(site);
		if rank == MatchRank::ExactMatch {
			return Some(entry);
		}
		if rank > candidate_rank {
			candidate = Some(entry);
			candidate_rank = rank;
		}
	}

	candidate.filter(|entry| candidate_rank >= entry.required_rank())
}

/// Shared matching for overrides that target a named member of a given kind.
#[derive(Clone)]
struct MemberMatcher {
	kind: MemberKind,
	name: Arc<str>,
	of_type: Option<TypeKey>,
	on_type: Option<TypeKey>,
	value: InjectionValue,
	required: MatchRank,
}

impl MemberMatcher {
	fn new(kind: MemberKind, name: Arc<str>, value: InjectionValue) -> Self {
		Self {
			kind,
			name,
			of_type: None,
			on_type: None,
			value,
			required: MatchRank::PartialMatch,
		}
	}

	fn rank(&self, site: &DependencySite<'_>) -> MatchRank {
		let site = site.site;
		if site.kind != self.kind || *site.member != *self.name {
			return MatchRank::NoMatch;
		}
		if self.of_type.as_ref().is_some_and(|key| *key != site.member_type)
			|| self.on_type.as_ref().is_some_and(|key| *key != site.declaring)
		{
			return MatchRank::NoMatch;
		}
		if self.of_type.is_some() || self.on_type.is_some() {
			MatchRank::ExactMatch
		} else {
			MatchRank::PartialMatch
		}
	}
}

impl fmt::Debug for MemberMatcher {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Override")
			.field("kind", &self.kind)
			.field("name", &self.name)
			.field("of_type", &self.of_type.as_ref().map(TypeKey::short_name))
			.field("on_type", &self.on_type.as_ref().map(TypeKey::short_name))
			.field("value", &self.value)
			.finish()
	}
}

macro_rules! member_override {
	($(#[$meta:meta])* $name:ident, $kind:expr) => {
		$(#[$meta])*
		#[derive(Clone, Debug)]
		pub struct $name(MemberMatcher);

		impl $name {
			pub fn new(name: impl Into<Arc<str>>, value: InjectionValue) -> Self {
				Self(MemberMatcher::new($kind, name.into(), value))
			}

			/// Restricts the override to members of type `T`.
			pub fn of_type<T: ?Sized + 'static>(mut self) -> Self {
				self.0.of_type = Some(TypeKey::of::<T>());
				self
			}

			/// Restricts the override to members declared on `T`.
			pub fn on_type<T: ?Sized + 'static>(mut self) -> Self {
				self.0.on_type = Some(TypeKey::of::<T>());
				self
			}

			pub fn require(mut self, rank: MatchRank) -> Self {
				self.0.required = rank;
				self
			}
		}

		impl ResolverOverride for $name {
			fn match_site(&self, site: &DependencySite<'_>) -> MatchRank {
				self.0.rank(site)
			}

			fn required_rank(&self) -> MatchRank {
				self.0.required
			}

			fn value(&self) -> &InjectionValue {
				&self.0.value
			}
		}
	};
}

member_override!(
	/// Overrides constructor and method parameters by name.
	ParameterOverride,
	MemberKind::Parameter
);
member_override!(
	/// Overrides injected fields by name.
	FieldOverride,
	MemberKind::Field
);
member_override!(
	/// Overrides injected properties by name.
	PropertyOverride,
	MemberKind::Property
);

/// Overrides every site that resolves a given contract.
///
/// Same type and same name is an exact match. An unnamed override also applies,
/// as a partial match, to named sites of the same type.
#[derive(Clone, Debug)]
pub struct DependencyOverride {
	contract: Contract,
	on_type: Option<TypeKey>,
	value: InjectionValue,
	required: MatchRank,
}

impl DependencyOverride {
	pub fn new(contract: Contract, value: InjectionValue) -> Self {
		Self {
			contract,
			on_type: None,
			value,
			required: MatchRank::PartialMatch,
		}
	}

	pub fn of<T: ?Sized + 'static>(value: InjectionValue) -> Self {
		Self::new(Contract::of::<T>(), value)
	}

	pub fn on_type<T: ?Sized + 'static>(mut self) -> Self {
		self.on_type = Some(TypeKey::of::<T>());
		self
	}

	pub fn require(mut self, rank: MatchRank) -> Self {
		self.required = rank;
		self
	}
}

impl ResolverOverride for DependencyOverride {
	fn match_site(&self, site: &DependencySite<'_>) -> MatchRank {
		if site.contract.key() != self.contract.key() {
			return MatchRank::NoMatch;
		}
		if self
			.on_type
			.as_ref()
			.is_some_and(|key| *key != site.site.declaring)
		{
			return MatchRank::NoMatch;
		}
		match (self.contract.name(), site.contract.name()) {
			(ours, theirs) if ours == theirs => MatchRank::ExactMatch,
			(None, Some(_)) => MatchRank::PartialMatch,
			_ => MatchRank::NoMatch,
		}
	}

	fn required_rank(&self) -> MatchRank {
		self.required
	}

	fn value(&self) -> &InjectionValue {
		&self.value
	}
}

/// Conversion into a shareable override, so resolve calls accept concrete types.
pub trait IntoOverride {
	fn into_override(self) -> Arc<dyn ResolverOverride>;
}

impl<T: ResolverOverride + 'static> IntoOverride for T {
	fn into_override(self) -> Arc<dyn ResolverOverride> {
		Arc::new(self)
	}
}

impl IntoOverride for Arc<dyn ResolverOverride> {
	fn into_override(self) -> Arc<dyn ResolverOverride> {
		self
	}
}

/// Collects overrides into the list a resolve call takes.
///
/// ```
/// use arbor_di::{overrides, FieldOverride, InjectionValue, ParameterOverride};
///
/// let list = overrides![
/// 	ParameterOverride::new("port", InjectionValue::value(8080_u16)),
/// 	FieldOverride::new("host", InjectionValue::value("localhost")),
/// ];
/// assert_eq!(list.len(), 2);
/// ```
#[macro_export]
macro_rules! overrides {
	($($item:expr),* $(,)?) => {
		vec![$($crate::IntoOverride::into_override($item)),*]
	};
}
