pub mod fair_chance;
