use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::ClubError;
use crate::models::{new_id, Action, Component, ComponentId, LoggedResource, User};
use crate::services::usage_service;
use crate::state::club::{self, ClubData, ClubStore};

/// Payload of `POST /components/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewComponent {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    pub quantity: u32,
}

/// A component with the counters a viewer needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentView {
    #[serde(flatten)]
    pub component: Component,
    pub available: u32,
    pub held_by_me: u32,
}

/// One line of "what am I holding".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holding {
    pub component_id: ComponentId,
    pub name: String,
    pub quantity: u32,
}

/// Outcome of a return: the updated component and how many units came back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Returned {
    pub component: ComponentView,
    pub returned: u32,
}

fn view(data: &ClubData, component: &Component, viewer_id: &str) -> ComponentView {
    ComponentView {
        component: component.clone(),
        available: component.available(),
        held_by_me: data.held(viewer_id, &component.id),
    }
}

pub fn create(store: &ClubStore, req: NewComponent) -> Result<Component, ClubError> {
    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(ClubError::Validation("component name must not be empty".into()));
    }

    let mut data = club::write(store);
    if data
        .components
        .values()
        .any(|c| c.name.eq_ignore_ascii_case(&name))
    {
        return Err(ClubError::Conflict(format!("component '{name}' already exists")));
    }

    let component = Component {
        id: new_id(),
        name,
        description: req.description.filter(|d| !d.trim().is_empty()),
        image: req.image.filter(|i| !i.trim().is_empty()),
        quantity: req.quantity,
        in_use: 0,
        created_at: Utc::now(),
    };
    data.components
        .insert(component.id.clone(), component.clone());

    tracing::info!("Added component '{}' x{}", component.name, component.quantity);
    Ok(component)
}

/// All components ordered by name, annotated for `viewer`.
pub fn list(store: &ClubStore, viewer: &User) -> Vec<ComponentView> {
    let data = club::read(store);
    let mut out: Vec<ComponentView> = data
        .components
        .values()
        .map(|c| view(&data, c, &viewer.id))
        .collect();
    out.sort_by(|a, b| a.component.name.cmp(&b.component.name));
    out
}

/// Remove a component nobody is holding.
pub fn delete(store: &ClubStore, id: &str) -> Result<Component, ClubError> {
    let mut data = club::write(store);
    let component = data
        .components
        .get(id)
        .ok_or(ClubError::NotFound("Component"))?;

    if component.in_use > 0 {
        return Err(ClubError::Conflict(format!(
            "{} units of '{}' are still in use",
            component.in_use, component.name
        )));
    }

    let removed = data
        .components
        .remove(id)
        .ok_or(ClubError::NotFound("Component"))?;
    for held in data.holdings.values_mut() {
        held.remove(id);
    }

    tracing::info!("Removed component '{}'", removed.name);
    Ok(removed)
}

/// Check out `quantity` units for `user`.
pub fn use_units(
    store: &ClubStore,
    id: &str,
    quantity: u32,
    user: &User,
) -> Result<ComponentView, ClubError> {
    if quantity == 0 {
        return Err(ClubError::Validation("quantity must be at least 1".into()));
    }

    let mut data = club::write(store);
    let component = data
        .components
        .get_mut(id)
        .ok_or(ClubError::NotFound("Component"))?;

    let available = component.available();
    if quantity > available {
        return Err(ClubError::InsufficientStock {
            requested: quantity,
            available,
        });
    }

    component.in_use += quantity;
    let resource = LoggedResource::Component {
        id: component.id.clone(),
        name: component.name.clone(),
    };
    let name = component.name.clone();

    *data
        .holdings
        .entry(user.id.clone())
        .or_default()
        .entry(id.to_string())
        .or_insert(0) += quantity;

    usage_service::record(&mut data, user, resource, quantity, Action::Taken, Utc::now());
    tracing::info!("{} took {} x '{}'", user.username, quantity, name);

    let component = &data.components[id];
    Ok(view(&data, component, &user.id))
}

/// Return every unit of the component that `user` holds.
pub fn return_units(store: &ClubStore, id: &str, user: &User) -> Result<Returned, ClubError> {
    let mut data = club::write(store);
    if !data.components.contains_key(id) {
        return Err(ClubError::NotFound("Component"));
    }

    let held = data.held(&user.id, id);
    if held == 0 {
        return Err(ClubError::NothingToReturn);
    }

    if let Some(mine) = data.holdings.get_mut(&user.id) {
        mine.remove(id);
        if mine.is_empty() {
            data.holdings.remove(&user.id);
        }
    }

    let component = data
        .components
        .get_mut(id)
        .ok_or(ClubError::NotFound("Component"))?;
    component.in_use = component.in_use.saturating_sub(held);
    let resource = LoggedResource::Component {
        id: component.id.clone(),
        name: component.name.clone(),
    };
    let name = component.name.clone();

    usage_service::record(&mut data, user, resource, held, Action::Returned, Utc::now());
    tracing::info!("{} returned {} x '{}'", user.username, held, name);

    let component = &data.components[id];
    Ok(Returned {
        component: view(&data, component, &user.id),
        returned: held,
    })
}

/// Everything `user` currently holds, ordered by component name.
pub fn holdings_of(store: &ClubStore, user: &User) -> Vec<Holding> {
    let data = club::read(store);
    let mut out: Vec<Holding> = data
        .holdings
        .get(&user.id)
        .into_iter()
        .flatten()
        .filter(|(_, q)| **q > 0)
        .filter_map(|(cid, &quantity)| {
            data.components.get(cid).map(|c| Holding {
                component_id: cid.clone(),
                name: c.name.clone(),
                quantity,
            })
        })
        .collect();
    out.sort_by(|a, b| a.name.cmp(&b.name));
    out
}
