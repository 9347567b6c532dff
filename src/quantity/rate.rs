quantity!(KilowattHourRate, via: f64, suffix: "¤/kWh", precision: 3);
