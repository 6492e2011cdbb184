use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Largest order the kitchen accepts on one ticket.
pub const MAX_PIZZAS_PER_ORDER: u64 = 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuItem {
    pub title: String,
    pub description: String,
    pub price: f64,
}

pub fn menu() -> Vec<MenuItem> {
    vec![
        MenuItem {
            title: "Margherita".to_string(),
            description: "Tomato, mozzarella, basil".to_string(),
            price: 8.5,
        },
        MenuItem {
            title: "Pepperoni".to_string(),
            description: "Double pepperoni, mozzarella".to_string(),
            price: 9.95,
        },
        MenuItem {
            title: "Veggie".to_string(),
            description: "A garden of delight".to_string(),
            price: 10.25,
        },
        MenuItem {
            title: "Crusty".to_string(),
            description: "A dry mouthed favorite".to_string(),
            price: 7.75,
        },
    ]
}

#[derive(Debug, Error)]
#[error("order of {0} pizzas exceeds kitchen capacity ({max})", max = MAX_PIZZAS_PER_ORDER)]
pub struct OverCapacity(pub u64);

/// Stand-in for the pizza factory: preparation takes time per pizza and
/// tickets over capacity are refused.
#[derive(Debug, Clone, Copy, Default)]
pub struct Kitchen;

impl Kitchen {
    pub fn new() -> Self {
        Self
    }

    pub async fn prepare(&self, pizzas: u64) -> Result<(), OverCapacity> {
        if pizzas > MAX_PIZZAS_PER_ORDER {
            return Err(OverCapacity(pizzas));
        }

        let per_pizza_ms = {
            let mut rng = rand::thread_rng();
            rng.gen_range(2..=8)
        };
        tokio::time::sleep(Duration::from_millis(per_pizza_ms * pizzas.max(1))).await;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_kitchen_bakes_orders_within_capacity() {
        let kitchen = Kitchen::new();
        assert!(kitchen.prepare(1).await.is_ok());
        assert!(kitchen.prepare(MAX_PIZZAS_PER_ORDER).await.is_ok());
    }

    #[tokio::test]
    async fn test_kitchen_refuses_oversized_tickets() {
        let kitchen = Kitchen::new();
        let err = kitchen.prepare(MAX_PIZZAS_PER_ORDER + 1).await.unwrap_err();
        assert_eq!(err.0, 21);
    }

    #[test]
    fn test_menu_prices_are_positive() {
        let menu = menu();
        assert!(!menu.is_empty());
        assert!(menu.iter().all(|item| item.price > 0.0));
    }
}
