//! Deduplication of time-clustered candidate tags
//!
//! Adjacent scan offsets often recognize the same trigger, producing a run
//! of candidates one stride apart. Candidates within the prune window of a
//! cluster head collapse into the single strongest member.

use crate::types::TriggerTag;

/// Candidates within this many ms of a cluster head join the cluster.
pub const PRUNE_WINDOW_MS: i64 = 500;

/// Collapses clusters of nearby candidate tags.
pub struct TagPruner;

impl TagPruner {
    /// Prune a candidate list that arrives in ascending `data_position`
    /// order. Per cluster the tag with the highest similarity survives;
    /// ties keep the earlier position. Output order stays ascending.
    pub fn prune(candidates: Vec<TriggerTag>) -> Vec<TriggerTag> {
        let mut pruned = Vec::new();
        let mut cluster: Vec<TriggerTag> = Vec::new();
        let mut head_position = 0i64;

        for tag in candidates {
            if cluster.is_empty() {
                head_position = tag.data_position;
                cluster.push(tag);
            } else if tag.data_position - head_position <= PRUNE_WINDOW_MS {
                cluster.push(tag);
            } else {
                pruned.push(Self::representative(std::mem::take(&mut cluster)));
                head_position = tag.data_position;
                cluster.push(tag);
            }
        }
        if !cluster.is_empty() {
            pruned.push(Self::representative(cluster));
        }

        pruned
    }

    fn representative(mut cluster: Vec<TriggerTag>) -> TriggerTag {
        let mut best = cluster.remove(0);
        for tag in cluster {
            if tag.similarity > best.similarity {
                best = tag;
            }
        }
        best
    }
}
