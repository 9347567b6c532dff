quantity!(Cost, via: f64, suffix: "¤", precision: 2);
