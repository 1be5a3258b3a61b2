use std::collections::HashSet;

use tracing::{debug, warn};

use crate::{
    config::RememberLayout,
    monitor::{MonitorRegistry, WorkloadOracle},
    workspace::{Layout, WorkspaceId},
};

/// What a repair did to a layout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Repair {
    /// `(old, new)` descriptor pairs whose workspace moved.
    pub substituted: Vec<(String, String)>,
    /// Descriptors removed without a replacement.
    pub dropped: Vec<String>,
}

impl Repair {
    pub fn is_clean(&self) -> bool {
        self.substituted.is_empty() && self.dropped.is_empty()
    }

    fn merge(&mut self, other: Repair) {
        self.substituted.extend(other.substituted);
        self.dropped.extend(other.dropped);
    }
}

/// One virtual desk and the monitor layouts it remembers.
///
/// Layouts are kept in insertion order. The first one is generated on
/// construction, later ones are appended whenever no remembered layout fits
/// the monitors that are enabled at the time.
#[derive(Debug)]
pub struct VirtualDesk {
    id: u32,
    name: String,
    layouts: Vec<Layout>,
    active_layout_idx: usize,
    active_is_valid: bool,
}

impl VirtualDesk {
    /// Creates desk `id` (1-based) with a layout for the currently enabled monitors.
    pub fn new<R: MonitorRegistry>(id: u32, name: impl Into<String>, registry: &R) -> Self {
        let mut vdesk = Self {
            id,
            name: name.into(),
            layouts: Vec::new(),
            active_layout_idx: 0,
            active_is_valid: true,
        };
        let layout = vdesk.generate_layout(registry);
        vdesk.layouts.push(layout);
        vdesk
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn layouts(&self) -> &[Layout] {
        &self.layouts
    }

    pub fn active_layout_idx(&self) -> usize {
        self.active_layout_idx
    }

    pub fn is_active_layout_valid(&self) -> bool {
        self.active_is_valid
    }

    /// Returns the layout to show, reselecting it first if the monitor set
    /// changed since the last call.
    pub fn active_layout<R: MonitorRegistry>(
        &mut self,
        registry: &R,
        remember: RememberLayout,
    ) -> &Layout {
        if !self.active_is_valid {
            self.select_active_layout(registry, remember);
            self.active_is_valid = true;
        }
        &self.layouts[self.active_layout_idx]
    }

    /// Marks the cached active layout stale. Call on any monitor change.
    pub fn invalidate_active_layout(&mut self) {
        self.active_is_valid = false;
    }

    fn select_active_layout<R: MonitorRegistry>(
        &mut self,
        registry: &R,
        remember: RememberLayout,
    ) {
        let monitors = registry.enabled_monitors();

        let found = match remember {
            RememberLayout::Monitors => {
                let current: HashSet<String> =
                    monitors.iter().map(|m| registry.descriptor(m)).collect();
                // A layout may use a subset of the enabled monitors.
                let found = self.layouts.iter().position(|layout| {
                    layout.monitors().iter().all(|desc| current.contains(*desc))
                });
                if let Some(idx) = found {
                    debug!(vdesk = self.id, idx, "found layout with monitors");
                }
                found
            }
            RememberLayout::Size => {
                let found = self
                    .layouts
                    .iter()
                    .position(|layout| layout.len() == monitors.len());
                if let Some(idx) = found {
                    debug!(vdesk = self.id, idx, "found layout with size {}", monitors.len());
                    let layout = &mut self.layouts[idx];
                    while !Self::repair_layout(registry, layout).substituted.is_empty() {}
                }
                found
            }
            RememberLayout::None => {
                self.layouts.clear();
                None
            }
        };

        self.active_layout_idx = match found {
            Some(idx) => idx,
            None => {
                let layout = self.generate_layout(registry);
                self.layouts.push(layout);
                self.layouts.len() - 1
            }
        };
    }

    /// Puts workspace `id` on `monitor` in the active layout.
    pub fn change_workspace<R: MonitorRegistry>(
        &mut self,
        registry: &R,
        monitor: &R::Monitor,
        id: WorkspaceId,
    ) {
        let desc = registry.descriptor(monitor);
        self.layouts[self.active_layout_idx].insert(desc, id);
    }

    pub fn reset_layout<R: MonitorRegistry>(&mut self, registry: &R) {
        self.layouts[self.active_layout_idx] = self.generate_layout(registry);
    }

    /// Moves the workspace of a removed monitor in every stored layout.
    pub fn remove_monitor_everywhere<O: WorkloadOracle>(
        &mut self,
        oracle: &O,
        descriptor: &str,
    ) -> Repair {
        let candidates = Self::candidates_without(oracle, descriptor);
        let mut repair = Repair::default();
        for layout in &mut self.layouts {
            repair.merge(Self::relocate(oracle, layout, descriptor, &candidates));
        }
        repair
    }

    /// Moves the workspace of a removed monitor in the active layout only.
    pub fn remove_monitor<O: WorkloadOracle>(&mut self, oracle: &O, descriptor: &str) -> Repair {
        let candidates = Self::candidates_without(oracle, descriptor);
        let layout = &mut self.layouts[self.active_layout_idx];
        Self::relocate(oracle, layout, descriptor, &candidates)
    }

    /// Moves every workspace of the active layout whose monitor is no longer
    /// enabled.
    pub fn remove_stale_entries<O: WorkloadOracle>(&mut self, oracle: &O) -> Repair {
        let enabled = oracle.enabled_monitors();
        let live: HashSet<String> = enabled.iter().map(|m| oracle.descriptor(m)).collect();

        let layout = &mut self.layouts[self.active_layout_idx];
        let stale: Vec<String> = layout
            .monitors()
            .into_iter()
            .filter(|desc| !live.contains(*desc))
            .map(str::to_owned)
            .collect();

        let mut repair = Repair::default();
        for desc in stale {
            repair.merge(Self::relocate(oracle, layout, &desc, &enabled));
        }
        repair
    }

    /// Swaps the first dead monitor of `layout` for an enabled monitor the
    /// layout doesn't use yet.
    ///
    /// Dead monitors met before that are dropped when every enabled monitor is
    /// already taken. Stops after one substitution, so callers that want a
    /// fully repaired layout repeat until nothing was substituted.
    pub fn repair_layout<R: MonitorRegistry>(registry: &R, layout: &mut Layout) -> Repair {
        let mut repair = Repair::default();
        let entries: Vec<(String, WorkspaceId)> =
            layout.iter().map(|(desc, id)| (desc.to_owned(), id)).collect();

        for (desc, id) in entries {
            if registry.is_live(&desc) {
                continue;
            }

            let unused = registry
                .enabled_monitors()
                .iter()
                .map(|m| registry.descriptor(m))
                .find(|candidate| !layout.contains(candidate));

            layout.remove(&desc);
            match unused {
                Some(new_desc) => {
                    debug!(workspace = id, "moving workspace from {desc:?} to {new_desc:?}");
                    layout.insert(new_desc.clone(), id);
                    repair.substituted.push((desc, new_desc));
                    return repair;
                }
                None => {
                    warn!(workspace = id, "no free monitor for {desc:?}, dropping it from layout");
                    repair.dropped.push(desc);
                }
            }
        }
        repair
    }

    /// Picks the candidate showing the fewest windows; the earliest wins ties.
    pub fn pick_replacement_monitor<'a, O: WorkloadOracle>(
        oracle: &O,
        candidates: &'a [O::Monitor],
    ) -> Option<&'a O::Monitor> {
        candidates
            .iter()
            .min_by_key(|monitor| oracle.windows_on_active_workspace(monitor))
    }

    /// Builds a layout placing workspaces `(id - 1) * n + 1 ..= id * n` on the
    /// `n` enabled monitors, in registry order.
    pub fn generate_layout<R: MonitorRegistry>(&self, registry: &R) -> Layout {
        let monitors = registry.enabled_monitors();
        debug!(
            "vdesk {} computing new layout for {} monitors",
            self.name,
            monitors.len()
        );

        let n = monitors.len() as WorkspaceId;
        let first = self.id.saturating_sub(1) * n + 1;
        monitors
            .iter()
            .zip(first..)
            .map(|(monitor, id)| {
                let desc = registry.descriptor(monitor);
                if desc.is_empty() {
                    warn!(workspace = id, "monitor has no description, keying it by \"\"");
                }
                (desc, id)
            })
            .collect()
    }

    fn candidates_without<R: MonitorRegistry>(registry: &R, descriptor: &str) -> Vec<R::Monitor> {
        registry
            .enabled_monitors()
            .into_iter()
            .filter(|monitor| registry.descriptor(monitor) != descriptor)
            .collect()
    }

    fn relocate<O: WorkloadOracle>(
        oracle: &O,
        layout: &mut Layout,
        descriptor: &str,
        candidates: &[O::Monitor],
    ) -> Repair {
        let mut repair = Repair::default();
        let Some(id) = layout.remove(descriptor) else {
            return repair;
        };

        match Self::pick_replacement_monitor(oracle, candidates) {
            Some(monitor) => {
                let new_desc = oracle.descriptor(monitor);
                debug!(workspace = id, "moving workspace from {descriptor:?} to {new_desc:?}");
                if let Some(previous) = layout.insert(new_desc.clone(), id) {
                    warn!(
                        workspace = previous,
                        "{new_desc:?} already had a workspace, it is no longer in the layout"
                    );
                }
                repair.substituted.push((descriptor.to_owned(), new_desc));
            }
            None => {
                warn!(
                    workspace = id,
                    "no monitor left for {descriptor:?}, dropping it from layout"
                );
                repair.dropped.push(descriptor.to_owned());
            }
        }
        repair
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_debug_snapshot;

    use super::*;
    use crate::monitor::{Output, Outputs};

    fn outputs(descs: &[&str]) -> Outputs {
        descs.iter().map(|desc| Output::new(*desc)).collect()
    }

    fn layout(entries: &[(&str, WorkspaceId)]) -> Layout {
        entries.iter().copied().collect()
    }

    #[test]
    fn generated_layout_is_offset_by_desk_id() {
        let outputs = outputs(&["A", "B", "C"]);
        let vdesk = VirtualDesk::new(2, "two", &outputs);

        assert_eq!(vdesk.layouts(), [layout(&[("A", 4), ("B", 5), ("C", 6)])]);
        assert_eq!(vdesk.active_layout_idx(), 0);
        assert!(vdesk.is_active_layout_valid());
    }

    #[test]
    fn generated_layout_follows_registry_order() {
        let outputs = outputs(&["Z", "A"]);
        let vdesk = VirtualDesk::new(1, "one", &outputs);

        assert_eq!(vdesk.generate_layout(&outputs), layout(&[("Z", 1), ("A", 2)]));
    }

    #[test]
    fn generated_layout_without_monitors_is_empty() {
        let vdesk = VirtualDesk::new(3, "three", &Outputs::new());
        assert_eq!(vdesk.layouts(), [Layout::new()]);
    }

    #[test]
    fn monitor_without_description_keeps_its_own_entry() {
        let mut outputs = outputs(&["", "B"]);
        let mut vdesk = VirtualDesk::new(1, "one", &outputs);
        assert_eq!(vdesk.layouts(), [layout(&[("", 1), ("B", 2)])]);

        outputs.set_windows("B", 3);
        outputs.add(Output::new("C"));
        outputs.set_enabled("", false);
        let repair = vdesk.remove_monitor(&outputs, "");

        assert_eq!(repair.substituted, [(String::new(), "C".to_owned())]);
        assert_eq!(vdesk.layouts(), [layout(&[("B", 2), ("C", 1)])]);
    }

    #[test]
    fn repair_moves_monitor_without_description() {
        let outputs = outputs(&["B", "C"]);
        let mut stored = layout(&[("", 1), ("B", 2)]);

        let repair = VirtualDesk::repair_layout(&outputs, &mut stored);

        assert_eq!(repair.substituted, [(String::new(), "C".to_owned())]);
        assert_eq!(stored, layout(&[("B", 2), ("C", 1)]));
    }

    #[test]
    fn by_monitors_picks_subset_layout() {
        let mut outputs = outputs(&["A", "B"]);
        let mut vdesk = VirtualDesk::new(1, "one", &outputs);

        outputs.add(Output::new("C"));
        vdesk.invalidate_active_layout();

        let active = vdesk.active_layout(&outputs, RememberLayout::Monitors).clone();
        assert_eq!(active, layout(&[("A", 1), ("B", 2)]));
        assert_eq!(vdesk.layouts().len(), 1);
        assert!(vdesk.is_active_layout_valid());
    }

    #[test]
    fn by_monitors_generates_when_a_monitor_is_missing() {
        let mut outputs = outputs(&["A", "B"]);
        let mut vdesk = VirtualDesk::new(1, "one", &outputs);

        outputs.set_enabled("B", false);
        vdesk.invalidate_active_layout();

        let active = vdesk.active_layout(&outputs, RememberLayout::Monitors).clone();
        assert_eq!(active, layout(&[("A", 1)]));
        assert_eq!(vdesk.layouts().len(), 2);
        assert_eq!(vdesk.active_layout_idx(), 1);

        // The two-monitor layout is remembered for when B comes back.
        outputs.set_enabled("B", true);
        vdesk.invalidate_active_layout();
        vdesk.active_layout(&outputs, RememberLayout::Monitors);
        assert_eq!(vdesk.active_layout_idx(), 0);
    }

    #[test]
    fn by_monitors_matches_empty_layout() {
        let mut outputs = Outputs::new();
        let mut vdesk = VirtualDesk::new(1, "one", &outputs);
        assert_eq!(vdesk.layouts(), [Layout::new()]);

        outputs.add(Output::new("A"));
        vdesk.invalidate_active_layout();
        let active = vdesk.active_layout(&outputs, RememberLayout::Monitors).clone();

        // No monitors is a subset of any monitor set.
        assert_eq!(active, Layout::new());
        assert_eq!(vdesk.layouts().len(), 1);
        assert_eq!(vdesk.active_layout_idx(), 0);
    }

    #[test]
    fn by_size_repairs_matching_layout() {
        let mut outputs = outputs(&["A", "B"]);
        let mut vdesk = VirtualDesk::new(1, "one", &outputs);

        outputs.set_enabled("B", false);
        outputs.add(Output::new("C"));
        vdesk.invalidate_active_layout();

        let active = vdesk.active_layout(&outputs, RememberLayout::Size);
        assert_debug_snapshot!(active, @r#"
        {
            "A": 1,
            "C": 2,
        }
        "#);
        assert_eq!(vdesk.layouts().len(), 1);
    }

    #[test]
    fn by_size_repairs_every_dead_monitor() {
        let mut outputs = outputs(&["A", "B", "C"]);
        let mut vdesk = VirtualDesk::new(1, "one", &outputs);

        outputs.set_enabled("A", false);
        outputs.set_enabled("B", false);
        outputs.add(Output::new("D"));
        outputs.add(Output::new("E"));
        vdesk.invalidate_active_layout();

        let active = vdesk.active_layout(&outputs, RememberLayout::Size).clone();
        assert_eq!(active, layout(&[("C", 3), ("D", 1), ("E", 2)]));
    }

    #[test]
    fn by_size_generates_on_count_mismatch() {
        let mut outputs = outputs(&["A", "B"]);
        let mut vdesk = VirtualDesk::new(2, "two", &outputs);

        outputs.add(Output::new("C"));
        vdesk.invalidate_active_layout();

        let active = vdesk.active_layout(&outputs, RememberLayout::Size).clone();
        assert_eq!(active, layout(&[("A", 4), ("B", 5), ("C", 6)]));
        assert_eq!(vdesk.layouts().len(), 2);
        assert_eq!(vdesk.active_layout_idx(), 1);
    }

    #[test]
    fn none_forgets_all_layouts() {
        let mut outputs = outputs(&["A", "B"]);
        let mut vdesk = VirtualDesk::new(1, "one", &outputs);

        outputs.add(Output::new("C"));
        vdesk.invalidate_active_layout();
        vdesk.active_layout(&outputs, RememberLayout::Size);
        assert_eq!(vdesk.layouts().len(), 2);

        vdesk.invalidate_active_layout();
        let active = vdesk.active_layout(&outputs, RememberLayout::None).clone();
        assert_eq!(active, layout(&[("A", 1), ("B", 2), ("C", 3)]));
        assert_eq!(vdesk.layouts().len(), 1);
        assert_eq!(vdesk.active_layout_idx(), 0);
    }

    #[test]
    fn fresh_active_layout_is_not_reselected() {
        let mut outputs = outputs(&["A", "B"]);
        let mut vdesk = VirtualDesk::new(1, "one", &outputs);
        vdesk.invalidate_active_layout();
        assert!(!vdesk.is_active_layout_valid());

        let first = vdesk.active_layout(&outputs, RememberLayout::None).clone();
        assert!(vdesk.is_active_layout_valid());

        // Without an invalidation the monitor change goes unnoticed.
        outputs.add(Output::new("C"));
        let second = vdesk.active_layout(&outputs, RememberLayout::None).clone();

        assert_eq!(first, second);
        assert_eq!(vdesk.layouts().len(), 1);
        assert_eq!(vdesk.active_layout_idx(), 0);
    }

    #[test]
    fn repair_drops_monitor_without_candidate() {
        let outputs = outputs(&["A"]);
        let mut stored = layout(&[("A", 1), ("B", 2)]);

        let repair = VirtualDesk::repair_layout(&outputs, &mut stored);

        assert_eq!(stored, layout(&[("A", 1)]));
        assert_eq!(repair.dropped, ["B"]);
        assert!(repair.substituted.is_empty());
    }

    #[test]
    fn repair_substitutes_once_per_call() {
        let outputs = outputs(&["C", "D"]);
        let mut stored = layout(&[("A", 1), ("B", 2)]);

        let repair = VirtualDesk::repair_layout(&outputs, &mut stored);
        assert_eq!(repair.substituted, [("A".to_owned(), "C".to_owned())]);
        assert_eq!(stored, layout(&[("B", 2), ("C", 1)]));

        let repair = VirtualDesk::repair_layout(&outputs, &mut stored);
        assert_eq!(repair.substituted, [("B".to_owned(), "D".to_owned())]);
        assert_eq!(stored, layout(&[("C", 1), ("D", 2)]));

        assert!(VirtualDesk::repair_layout(&outputs, &mut stored).is_clean());
    }

    #[test]
    fn replacement_prefers_least_loaded_monitor() {
        let outputs: Outputs = [
            Output::new("A").with_windows(3),
            Output::new("B"),
            Output::new("C").with_windows(5),
        ]
        .into_iter()
        .collect();
        let candidates = outputs.enabled_monitors();

        let picked = VirtualDesk::pick_replacement_monitor(&outputs, &candidates);
        assert_eq!(picked.map(|m| m.descriptor.as_str()), Some("B"));
    }

    #[test]
    fn replacement_tie_goes_to_first_candidate() {
        let outputs: Outputs = [
            Output::new("A").with_windows(1),
            Output::new("B"),
            Output::new("C"),
        ]
        .into_iter()
        .collect();
        let candidates = outputs.enabled_monitors();

        let picked = VirtualDesk::pick_replacement_monitor(&outputs, &candidates);
        assert_eq!(picked.map(|m| m.descriptor.as_str()), Some("B"));
        assert!(VirtualDesk::pick_replacement_monitor(&outputs, &[]).is_none());
    }

    #[test]
    fn remove_monitor_touches_active_layout_only() {
        let mut outputs = outputs(&["A", "B"]);
        let mut vdesk = VirtualDesk::new(1, "one", &outputs);
        outputs.add(Output::new("C"));
        vdesk.invalidate_active_layout();
        vdesk.active_layout(&outputs, RememberLayout::Size);

        outputs.set_windows("A", 2);
        outputs.set_windows("C", 1);
        outputs.set_enabled("B", false);
        let repair = vdesk.remove_monitor(&outputs, "B");

        assert_eq!(repair.substituted, [("B".to_owned(), "C".to_owned())]);
        assert_eq!(
            vdesk.layouts(),
            [layout(&[("A", 1), ("B", 2)]), layout(&[("A", 1), ("C", 2)])]
        );
    }

    #[test]
    fn remove_monitor_never_picks_the_removed_monitor() {
        let outputs: Outputs = [Output::new("A").with_windows(4), Output::new("B")]
            .into_iter()
            .collect();
        let mut vdesk = VirtualDesk::new(1, "one", &outputs);

        // B is still enabled and the least loaded, but it's the one going away.
        vdesk.remove_monitor(&outputs, "B");
        assert_eq!(vdesk.layouts(), [layout(&[("A", 2)])]);
    }

    #[test]
    fn remove_monitor_everywhere_repairs_each_layout() {
        let mut outputs = outputs(&["A", "B"]);
        let mut vdesk = VirtualDesk::new(1, "one", &outputs);
        outputs.add(Output::new("C").with_windows(1));
        vdesk.invalidate_active_layout();
        vdesk.active_layout(&outputs, RememberLayout::Size);

        outputs.remove("A");
        let repair = vdesk.remove_monitor_everywhere(&outputs, "A");

        assert_eq!(repair.substituted.len(), 2);
        assert_eq!(
            vdesk.layouts(),
            [layout(&[("B", 1)]), layout(&[("B", 1), ("C", 3)])]
        );
    }

    #[test]
    fn remove_monitor_without_candidates_drops_entry() {
        let mut outputs = outputs(&["A"]);
        let mut vdesk = VirtualDesk::new(1, "one", &outputs);

        outputs.set_enabled("A", false);
        let repair = vdesk.remove_monitor(&outputs, "A");

        assert_eq!(repair.dropped, ["A"]);
        assert_eq!(vdesk.layouts(), [Layout::new()]);
    }

    #[test]
    fn remove_stale_entries_moves_every_dead_monitor() {
        let mut outputs = outputs(&["A", "B", "C"]);
        let mut vdesk = VirtualDesk::new(1, "one", &outputs);

        outputs.set_windows("A", 2);
        outputs.set_enabled("B", false);
        outputs.remove("C");
        outputs.add(Output::new("D"));
        let repair = vdesk.remove_stale_entries(&outputs);

        // Both dead monitors land on D, the later one wins.
        assert_eq!(repair.substituted.len(), 2);
        assert_eq!(vdesk.layouts(), [layout(&[("A", 1), ("D", 3)])]);
    }

    #[test]
    fn change_workspace_overwrites_active_entry() {
        let outputs = outputs(&["A", "B"]);
        let mut vdesk = VirtualDesk::new(1, "one", &outputs);

        let b = outputs.find_by_descriptor("B").unwrap();
        vdesk.change_workspace(&outputs, &b, 9);
        assert_eq!(vdesk.layouts(), [layout(&[("A", 1), ("B", 9)])]);
    }

    #[test]
    fn reset_layout_regenerates_active_layout() {
        let mut outputs = outputs(&["A", "B"]);
        let mut vdesk = VirtualDesk::new(2, "two", &outputs);
        let b = outputs.find_by_descriptor("B").unwrap();
        vdesk.change_workspace(&outputs, &b, 9);

        outputs.add(Output::new("C"));
        vdesk.reset_layout(&outputs);
        assert_eq!(vdesk.layouts(), [layout(&[("A", 4), ("B", 5), ("C", 6)])]);
    }

    #[test]
    fn layouts_never_empty_and_active_in_range() {
        let mut outputs = outputs(&["A", "B"]);
        let mut vdesk = VirtualDesk::new(1, "one", &outputs);

        let check = |vdesk: &VirtualDesk| {
            assert!(!vdesk.layouts().is_empty());
            assert!(vdesk.active_layout_idx() < vdesk.layouts().len());
        };

        let steps: [&dyn Fn(&mut Outputs); 5] = [
            &|o: &mut Outputs| o.add(Output::new("C")),
            &|o: &mut Outputs| {
                o.set_enabled("A", false);
            },
            &|o: &mut Outputs| {
                o.remove("B");
            },
            &|o: &mut Outputs| {
                o.set_enabled("C", false);
            },
            &|o: &mut Outputs| o.add(Output::new("A")),
        ];

        for remember in [RememberLayout::Monitors, RememberLayout::Size, RememberLayout::None] {
            for step in &steps {
                step(&mut outputs);
                vdesk.invalidate_active_layout();
                vdesk.active_layout(&outputs, remember);
                check(&vdesk);

                vdesk.remove_stale_entries(&outputs);
                check(&vdesk);
            }
        }
    }
}
