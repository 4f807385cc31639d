// Built-in starting script, restored by reset

/// Gradient circle with a title. Used when storage holds no script.
pub const TEMPLATE: &str = r#"export const config = {
  canvasWidth = 600,
  canvasHeight = 600,
  position = 'center',
  backgroundColor = '#0b0f19',
  fonts = {
    { fontName = 'Inter', weights = { 400, 600 }, subset = 'latin', display = 'swap', format = 'woff2' },
  },
}

-- Dark base
ctx.fillStyle = '#111827'
ctx:fillRect(0, 0, config.canvasWidth, config.canvasHeight)

-- Gradient
local gradient = ctx:createLinearGradient(0, 0, config.canvasWidth, config.canvasHeight)
gradient:addColorStop(0, '#f43f5e') -- rose
gradient:addColorStop(1, '#6366f1') -- indigo

-- Center circle
ctx.fillStyle = gradient
ctx:beginPath()
ctx:arc(300, 300, 150, 0, math.pi * 2)
ctx:fill()

-- Glow
ctx.shadowColor = '#f43f5e'
ctx.shadowBlur = 50

-- Text
ctx.fillStyle = 'white'
ctx.shadowBlur = 0
ctx.font = 'bold 40px Inter, sans-serif'
ctx.textAlign = 'center'
ctx:fillText('Canvas Editor', 300, 280)

ctx.font = 'normal 20px Inter, sans-serif'
ctx.fillStyle = '#cbd5e1'
ctx:fillText('Changes are saved automatically', 300, 320)
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use canvas_studio_engine::{extract_config, sanitize, Position};

    #[test]
    fn test_template_config() {
        let config = extract_config(TEMPLATE);
        assert_eq!(config.canvas_width, 600);
        assert_eq!(config.canvas_height, 600);
        assert_eq!(config.position, Position::Center);
        assert_eq!(config.background_color.as_deref(), Some("#0b0f19"));
        assert_eq!(config.fonts.len(), 1);
        assert_eq!(config.fonts[0].font_name, "Inter");
        assert_eq!(config.fonts[0].weights, vec![400, 600]);
    }

    #[test]
    fn test_template_sanitizes_to_local() {
        let sanitized = sanitize(TEMPLATE);
        assert!(sanitized.starts_with("local config <const> = {"));
    }
}
