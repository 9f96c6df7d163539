#[derive(Debug, Clone, PartialEq)]
pub struct PbrMaterialData {
    pub name: String,
    pub base_color_factor: [f32; 4],
    pub metallic_factor: f32,
    pub roughness_factor: f32,
}

impl PbrMaterialData {
    /// Neutral light grey, tinted per player by the game.
    pub fn bean() -> Self {
        Self {
            name: "BeanMaterial".to_string(),
            base_color_factor: [0.85, 0.85, 0.85, 1.0],
            metallic_factor: 0.0,
            roughness_factor: 0.7,
        }
    }
}
