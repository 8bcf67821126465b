use bimap::BiMap;

use crate::api::scenario_dto::ActivityDto;
use crate::domain::scheduling_model::activity::successor::{SuccessorIndex, SuccessorLink};
use crate::domain::scheduling_model::utils::handles::ActivityId;
use crate::domain::scheduling_model::utils::id::ActivityName;
use crate::error::{Error, Result};

/// Resolves the by-name successor links of a bulk load into arena handles.
///
/// Runs once, after every activity of the load has been inserted. `names` maps each
/// loaded activity's name to its handle in both directions.
///
/// # Returns
/// The immutable successor index, or `ModelConstructionError` naming the first link that
/// points at an unknown activity or at the activity itself.
pub fn resolve_links(activities: &[ActivityDto], names: &BiMap<ActivityName, ActivityId>) -> Result<SuccessorIndex> {
    let mut links = Vec::new();

    for dto in activities {
        let predecessor_name = ActivityName::new(dto.name.clone());
        let Some(&predecessor) = names.get_by_left(&predecessor_name) else {
            return Err(Error::ModelConstructionError(format!("Activity {} was not loaded before link resolution", dto.name)));
        };

        for successor_dto in &dto.successors {
            let successor_name = ActivityName::new(successor_dto.activity.clone());
            let Some(&successor) = names.get_by_left(&successor_name) else {
                log::error!("Activity {} links to unknown successor {}.", dto.name, successor_dto.activity);
                return Err(Error::ModelConstructionError(format!(
                    "Activity {} links to unknown successor {}",
                    dto.name, successor_dto.activity
                )));
            };

            if successor == predecessor {
                log::error!("Activity {} lists itself as its successor.", dto.name);
                return Err(Error::ModelConstructionError(format!("Activity {} lists itself as its successor", dto.name)));
            }

            if let Some(delay) = successor_dto.max_delay {
                if delay < 0 {
                    return Err(Error::ModelConstructionError(format!(
                        "Link {} -> {} has a negative max delay of {}",
                        dto.name, successor_dto.activity, delay
                    )));
                }
            }

            links.push(SuccessorLink { predecessor, successor, max_delay: successor_dto.max_delay });
        }
    }

    log::debug!("Resolved {} successor links between {} activities.", links.len(), names.len());
    Ok(SuccessorIndex::from_links(links))
}

